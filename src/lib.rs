//! Library to backup one or more [MongoDB][mongo] instances using [`mongodump`][dump].
//!
//! Every configured instance is dumped into `<backup_root>/<instance>/<YYYY-MM-DD>`.
//! Connections are discovered by the [`connections`] module, dumps are taken by
//! the [`backup`] module and old dated dumps are removed by [`util::retention`],
//! but only after the instance was backed up successfully.
//! The [`orchestrator`] ties these together.
//!
//! [mongo]: https://www.mongodb.com/
//! [dump]: https://www.mongodb.com/docs/database-tools/mongodump/

#![forbid(unsafe_code)]

pub mod backup;
pub mod cli;
pub mod connections;
pub mod logging;
pub mod orchestrator;
pub mod util;
