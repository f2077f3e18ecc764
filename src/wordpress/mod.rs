//! WordPress installation discovery and active plugin reporting.
//!
//! The pipeline runs in four steps: [`vhost`] turns Apache virtual host
//! files into document roots, [`site`] keeps the roots that hold a
//! WordPress install, [`config`] reads each install's database name and
//! table prefix, and [`report`] queries the options table and resolves the
//! active plugins ([`plugins`]) to their headers.

pub mod config;
pub mod plugins;
pub mod report;
pub mod site;
pub mod vhost;
