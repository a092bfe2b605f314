//! Database module for PostgreSQL (RDS) connectivity
//!
//! One connection per run: opened here, closed by the caller on every path.

pub mod connection;

pub use connection::{
    close_quietly, connect, connect_options, connect_with, qualified_table, quote_ident,
    split_table_name,
};
