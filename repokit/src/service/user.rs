//! User account operations

use crate::context::Context;
use crate::error::{Error, Result};
use crate::model::UserDto;
use crate::repository::{PaginationMetadata, Repository, RepositoryResult, Specification};

/// Entry point for user reads and writes
pub struct UserService<R> {
    repo: R,
}

impl<R> UserService<R>
where
    R: Repository<UserDto>,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Every live user
    pub async fn find_all(&self, ctx: &Context) -> RepositoryResult<Vec<UserDto>> {
        self.repo.find_all(ctx).await.inspect_err(|e| {
            tracing::error!(kind = %e.kind, "Listing users failed: {}", e.message);
        })
    }

    /// One page of users matching `specs`
    pub async fn find_page(
        &self,
        ctx: &Context,
        page: i64,
        per_page: i64,
        specs: &[Specification],
    ) -> RepositoryResult<(Vec<UserDto>, PaginationMetadata)> {
        self.repo
            .find_with_pagination(ctx, page, per_page, specs)
            .await
            .inspect_err(|e| {
                tracing::error!(kind = %e.kind, page, per_page, "Paging users failed: {}", e.message);
            })
    }

    pub async fn find_by_id(&self, ctx: &Context, id: i64) -> RepositoryResult<UserDto> {
        self.repo.find_by_id(ctx, id).await.inspect_err(|e| {
            if !e.is_not_found() {
                tracing::error!(id, kind = %e.kind, "Loading user failed: {}", e.message);
            }
        })
    }

    /// Store a new user and refresh `dto` with the stored row
    pub async fn create(&self, ctx: &Context, dto: &mut UserDto) -> Result<()> {
        validate(dto)?;
        self.repo.insert(ctx, dto).await.inspect_err(|e| {
            tracing::error!(username = %dto.username, kind = %e.kind, "Creating user failed: {}", e.message);
        })?;
        tracing::info!(id = dto.meta.id, username = %dto.username, "User created");
        Ok(())
    }

    /// Write back `dto` by primary key
    pub async fn update(&self, ctx: &Context, dto: &mut UserDto) -> Result<()> {
        if dto.meta.is_new() {
            return Err(Error::BadRequest("User id is required".to_string()));
        }
        validate(dto)?;
        self.repo.update(ctx, dto).await.inspect_err(|e| {
            tracing::error!(id = dto.meta.id, kind = %e.kind, "Updating user failed: {}", e.message);
        })?;
        Ok(())
    }

    pub async fn delete_by_id(&self, ctx: &Context, id: i64) -> RepositoryResult<()> {
        self.repo.delete_by_id(ctx, id).await.inspect_err(|e| {
            tracing::error!(id, kind = %e.kind, "Deleting user failed: {}", e.message);
        })?;
        tracing::info!(id, "User deleted");
        Ok(())
    }
}

fn validate(dto: &UserDto) -> Result<()> {
    if dto.username.trim().is_empty() {
        return Err(Error::BadRequest("Username is required".to_string()));
    }
    Ok(())
}
