pub use anyhow::{Context, bail, ensure};

pub type CliResult<T> = anyhow::Result<T>;
