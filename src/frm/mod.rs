//! Rebuilding a database from raw `.frm`/`.ibd` table files.
//!
//! The schema is recovered with `mysqlfrm --diagnostic` ([`dump`]) and
//! loaded with the `mysql` client; table data is then attached by
//! discarding each freshly created tablespace and importing the original
//! `.ibd` file in its place. The external programs are driven by [`tools`].

pub mod dump;
pub mod tools;
