//
// apon/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! APON (Aspectran Parameters Object Notation): an indented
//! name/value text format used for settings and for the APON
//! transform response.
//!

mod parameters;
mod reader;
mod writer;

pub use self::parameters::{ParameterValue, Parameters};
pub use self::reader::AponReader;
pub use self::writer::AponWriter;
