//! Silicon model for the memory-mapped multiply-accumulate (MAC) peripheral.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the peripheral: register offsets, the size of the register
//! window, and the two status encodings the peripheral revisions use.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Register map: STATUS, X, Y, MAC offsets and status bits |
//! | [`protocol`] | [`StatusProtocol`]: how a status byte decodes into ready / done |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod protocol;
pub mod regs;

pub use protocol::StatusProtocol;
