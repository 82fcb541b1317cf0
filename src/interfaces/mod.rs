//! Outer adapters that turn files into engine commands and engine state back
//! into files.

pub mod csv;
