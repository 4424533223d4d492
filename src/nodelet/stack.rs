//
// nodelet/stack.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::any;

use crate::error::NodeletError;

// =====================================================================
/// An entry of ObjectStack: a closed enum of the objects a grammar
/// builds while its document is parsed.
///
pub trait StackEntry {
    fn entry_name(&self) -> &'static str;
}

/// Typed access to one variant of a StackEntry enum.
///
pub trait Downcast<T>: Sized {
    fn downcast_ref(&self) -> Option<&T>;
    fn downcast_mut(&mut self) -> Option<&mut T>;
    fn downcast(self) -> Result<T, Self>;
}

// ---------------------------------------------------------------------
/// Declares a StackEntry enum with From and Downcast for each variant.
/// Every variant must wrap a distinct type.
///
#[macro_export]
macro_rules! stack_entries {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident($ty:ty) ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $variant($ty) ),*
        }

        impl $crate::nodelet::StackEntry for $name {
            fn entry_name(&self) -> &'static str {
                match self {
                    $( $name::$variant(_) => stringify!($variant) ),*
                }
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(v: $ty) -> $name {
                    $name::$variant(v)
                }
            }

            #[allow(unreachable_patterns)]
            impl $crate::nodelet::Downcast<$ty> for $name {
                fn downcast_ref(&self) -> Option<&$ty> {
                    match self {
                        $name::$variant(v) => Some(v),
                        _ => None,
                    }
                }
                fn downcast_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        $name::$variant(v) => Some(v),
                        _ => None,
                    }
                }
                fn downcast(self) -> Result<$ty, $name> {
                    match self {
                        $name::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }
            }
        )*
    }
}

// =====================================================================
/// Stack of the objects under construction.  Popping or peeking with
/// the wrong type is an error, never a silent cast.
///
#[derive(Debug)]
pub struct ObjectStack<E> {
    entries: Vec<E>,
}

impl<E: StackEntry> Default for ObjectStack<E> {
    fn default() -> Self {
        return ObjectStack { entries: vec!{} };
    }
}

impl<E: StackEntry> ObjectStack<E> {
    pub fn new() -> ObjectStack<E> {
        return ObjectStack::default();
    }

    pub fn push<T: Into<E>>(&mut self, object: T) {
        self.entries.push(object.into());
    }

    // -----------------------------------------------------------------
    /// Pops the top entry as T; on mismatch the entry stays in place.
    ///
    pub fn pop<T>(&mut self) -> Result<T, NodeletError> where E: Downcast<T> {
        let entry = self.entries.pop().ok_or_else(|| mismatch::<T>(None))?;
        match entry.downcast() {
            Ok(v) => return Ok(v),
            Err(entry) => {
                let err = mismatch::<T>(Some(entry.entry_name()));
                self.entries.push(entry);
                return Err(err);
            },
        }
    }

    pub fn peek<T>(&self) -> Result<&T, NodeletError> where E: Downcast<T> {
        return self.peek_at(0);
    }

    pub fn peek_mut<T>(&mut self) -> Result<&mut T, NodeletError> where E: Downcast<T> {
        return self.peek_mut_at(0);
    }

    // -----------------------------------------------------------------
    /// Entry 'n' below the top (0 is the top).
    ///
    pub fn peek_at<T>(&self, n: usize) -> Result<&T, NodeletError> where E: Downcast<T> {
        let entry = self.entry_at(n);
        let found = entry.map(|e| e.entry_name());
        return entry.and_then(|e| e.downcast_ref()).ok_or_else(|| mismatch::<T>(found));
    }

    pub fn peek_mut_at<T>(&mut self, n: usize) -> Result<&mut T, NodeletError> where E: Downcast<T> {
        let len = self.entries.len();
        if n >= len {
            return Err(mismatch::<T>(None));
        }
        let entry = &mut self.entries[len - 1 - n];
        let found = entry.entry_name();
        return entry.downcast_mut().ok_or_else(|| mismatch::<T>(Some(found)));
    }

    pub fn peek_entry(&self) -> Option<&E> {
        return self.entries.last();
    }

    pub fn peek_entry_mut(&mut self) -> Option<&mut E> {
        return self.entries.last_mut();
    }

    pub fn pop_entry(&mut self) -> Option<E> {
        return self.entries.pop();
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry_at(&self, n: usize) -> Option<&E> {
        let len = self.entries.len();
        if n >= len {
            return None;
        }
        return self.entries.get(len - 1 - n);
    }
}

// ---------------------------------------------------------------------
//
fn mismatch<T>(found: Option<&'static str>) -> NodeletError {
    let full = any::type_name::<T>();
    let expected = match full.find('<') {
        Some(_) => full,
        None => full.rsplit("::").next().unwrap_or(full),
    };
    return NodeletError::StackMismatch {
        expected,
        found: String::from(found.unwrap_or("nothing")),
    };
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Translet(String);

    #[derive(Debug, PartialEq)]
    struct Item(i32);

    stack_entries! {
        #[derive(Debug)]
        enum TestEntry {
            Translet(Translet),
            Item(Item),
        }
    }

    #[test]
    fn test_push_pop() {
        let mut stack: ObjectStack<TestEntry> = ObjectStack::new();
        stack.push(Translet(String::from("/a")));
        stack.push(Item(1));
        assert_eq!(stack.len(), 2);

        assert_eq!(stack.peek::<Item>().unwrap(), &Item(1));
        assert_eq!(stack.peek_at::<Translet>(1).unwrap(), &Translet(String::from("/a")));
        stack.peek_mut::<Item>().unwrap().0 = 2;

        assert_eq!(stack.pop::<Item>().unwrap(), Item(2));
        assert_eq!(stack.pop::<Translet>().unwrap(), Translet(String::from("/a")));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_mismatch() {
        let mut stack: ObjectStack<TestEntry> = ObjectStack::new();
        stack.push(Item(1));
        let err = stack.pop::<Translet>().unwrap_err();
        assert_eq!(err.to_string(), "Object stack mismatch: expected Translet, found Item");
        assert_eq!(stack.len(), 1);
        assert!(stack.peek_at::<Item>(1).is_err());
        stack.clear();
        let err = stack.pop::<Item>().unwrap_err();
        assert_eq!(err.to_string(), "Object stack mismatch: expected Item, found nothing");
    }
}
