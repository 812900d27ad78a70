use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DbConn, DbErr, EntityTrait,
    IntoActiveModel, PrimaryKeyTrait, SqlErr,
};

use quire_core::error::RepoError;
use quire_core::ports::BaseRepository;

/// Generic PostgreSQL repository implementation.
pub struct PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: DbConn,
    _entity: PhantomData<E>,
}

impl<E> PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

/// Classify a SeaORM error. Unique violations surface as constraint errors
/// so services can report duplicates.
pub(crate) fn map_db_err(err: DbErr) -> RepoError {
    if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
        return RepoError::Constraint(msg);
    }

    let msg = err.to_string();
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(msg),
        _ if msg.contains("duplicate") || msg.contains("unique") => RepoError::Constraint(msg),
        _ => RepoError::Query(msg),
    }
}

/// Update the row with the model's primary key, inserting it when no such
/// row exists yet. Every column must be `Set`.
pub(crate) async fn upsert<A, C>(
    model: A,
    db: &C,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    match model.clone().update(db).await {
        Err(DbErr::RecordNotUpdated) => model.insert(db).await,
        result => result,
    }
}

#[async_trait]
impl<E, T, ID> BaseRepository<T, ID> for PostgresBaseRepository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + Send,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = ID>,
    ID: Send + Sync + Into<sea_orm::Value> + Clone + Copy + 'static,
    T: From<E::Model> + Into<E::ActiveModel> + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError> {
        let result = E::find_by_id(id).one(&self.db).await.map_err(map_db_err)?;
        Ok(result.map(Into::into))
    }

    async fn save(&self, entity: T) -> Result<T, RepoError> {
        let active_model: E::ActiveModel = entity.into();
        let model = upsert(active_model, &self.db).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn delete(&self, id: ID) -> Result<(), RepoError> {
        let result = E::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
