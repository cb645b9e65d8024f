use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    #[error("migration error: {0}")]
    Migration(#[from] migrant_lib::Error),
}

impl From<Error> for crawler_core::error::Error {
    fn from(err: Error) -> crawler_core::error::Error {
        crawler_core::error::Error::Custom(err.to_string())
    }
}
