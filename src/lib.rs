pub use depot_core::*;
