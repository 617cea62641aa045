#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use bulwark_core as base;

#[doc(inline)]
pub use bulwark_augment as augment;

#[doc(inline)]
pub use bulwark_detection as detection;
