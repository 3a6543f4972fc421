//! Wire types shared between the disaster server and its browser client.

pub mod protocol;
