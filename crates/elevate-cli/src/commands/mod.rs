pub(crate) mod config;
pub(crate) mod escalate;
pub(crate) mod policy;
