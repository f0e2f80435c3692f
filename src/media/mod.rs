pub(crate) mod materialize;
pub(crate) mod probe;
pub(crate) mod run;
