//
// parser/resolver.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::io;

use tracing::trace;

use crate::dtd::EntityResolver;

pub const ASPECTRAN_DTD_PUBLIC_ID: &str = "-//ASPECTRAN//DTD Aspectran 1.0//EN";
pub const ASPECTRAN_DTD_SYSTEM_ID: &str = "aspectran-1.0.dtd";

const ASPECTRAN_DTD: &str = include_str!("aspectran-1.0.dtd");

// =====================================================================
/// Serves the bundled aspectran-1.0.dtd, so validating a document
/// never reads the DTD from disk or network.
///
/// A DOCTYPE matches by its public id, or by a system id whose last
/// path segment is the DTD file name.
///
#[derive(Debug, Clone, Default)]
pub struct AspectranDtdResolver;

impl AspectranDtdResolver {
    pub fn new() -> AspectranDtdResolver {
        return AspectranDtdResolver;
    }

    pub fn dtd_text() -> &'static str {
        return ASPECTRAN_DTD;
    }
}

impl EntityResolver for AspectranDtdResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>)
            -> Result<Option<String>, io::Error> {
        let by_public = public_id.map_or(false, |id| id == ASPECTRAN_DTD_PUBLIC_ID);
        let by_system = system_id.map_or(false, |id| {
            id.rsplit(|c| c == '/' || c == '\\').next() == Some(ASPECTRAN_DTD_SYSTEM_ID)
        });
        if by_public || by_system {
            trace!("bundled DTD for {:?} {:?}", public_id, system_id);
            return Ok(Some(String::from(ASPECTRAN_DTD)));
        }
        return Ok(None);
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::dtd::Dtd;

    #[test]
    fn test_resolve() {
        let resolver = AspectranDtdResolver::new();
        let test_specs = [
            ( Some(ASPECTRAN_DTD_PUBLIC_ID), None, true ),
            ( None, Some("http://aspectran.com/dtd/aspectran-1.0.dtd"), true ),
            ( None, Some("aspectran-1.0.dtd"), true ),
            ( Some("-//W3C//DTD XHTML 1.0 Strict//EN"), Some("xhtml1-strict.dtd"), false ),
            ( None, None, false ),
        ];
        for (public_id, system_id, guess) in test_specs.iter() {
            let resolved = resolver.resolve_entity(*public_id, *system_id).unwrap();
            assert_eq!(resolved.is_some(), *guess, "{:?} {:?}", public_id, system_id);
        }
    }

    #[test]
    fn test_bundled_dtd_parses() {
        let dtd = Dtd::parse(AspectranDtdResolver::dtd_text()).unwrap();
        let mut attrs = vec!{};
        assert!(dtd.check_element(None, "aspectran", &mut attrs).is_ok());
        assert!(dtd.check_element(Some("aspectran"), "translet", &mut attrs).is_err());
        let mut attrs = vec![crate::sax::Attr::new("name", "/a")];
        assert!(dtd.check_element(Some("aspectran"), "translet", &mut attrs).is_ok());
        assert!(dtd.check_element(Some("translet"), "bean", &mut vec!{}).is_err());
    }
}
