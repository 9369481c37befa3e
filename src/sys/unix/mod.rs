mod poll;

pub mod pipe;

pub use self::poll::poll;
