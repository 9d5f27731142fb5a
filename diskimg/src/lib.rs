//! Layered data sources for vintage Macintosh disk images.
//!
//! An image file is often wrapped: a Disk Copy 4.2 envelope around a
//! floppy, raw 2352-byte CD-ROM sectors around a track, an Apple Partition
//! Map around several volumes. This crate models random-access byte
//! windows ([`DataSource`]) and unwraps those container layers into the
//! plain ranges that filesystem parsers read.

pub mod apm;
pub mod bin;
pub mod dc42;
pub mod error;
pub mod expand;
pub mod source;

pub use error::{ImgError, Result};
pub use expand::expand;
pub use source::DataSource;
