//! Network interface enumeration from `/sys/class/net`.

pub mod interfaces;

pub use interfaces::{
    DEFAULT_NET_PATH, EnumerationError, Interface, InterfaceEnumerator, InterfaceFilter,
};
