pub(crate) mod app;
pub(crate) mod boot;
pub(crate) mod fs;
