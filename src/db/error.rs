use std::fmt::Display;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("Unable to open database: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Fill failed while {phase}: {source}")]
    Fill {
        phase: String,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("{0}")]
    Query(#[from] sea_orm::DbErr),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Names the step a database error happened in
pub trait InPhase<T> {
    fn in_phase(self, phase: impl Display) -> DbResult<T>;
}

impl<T> InPhase<T> for Result<T, sea_orm::DbErr> {
    fn in_phase(self, phase: impl Display) -> DbResult<T> {
        self.map_err(|source| DbError::Fill {
            phase: phase.to_string(),
            source,
        })
    }
}
