mod manifest;
mod store;

pub use store::GridStore;
