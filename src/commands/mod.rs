pub mod apply;
pub mod record;
pub mod search;
