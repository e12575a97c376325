//! # Category Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kiosk_core::Category;

const SELECT_CATEGORY: &str = r#"
    SELECT id, name, description, created_at, updated_at
    FROM categories
"#;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a new category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already used (case-insensitive)
    pub async fn insert(&self, category: &Category) -> DbResult<Category> {
        debug!(id = %category.id, name = %category.name, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(category.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    /// All categories, by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} ORDER BY name COLLATE NOCASE"))
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }

    pub async fn update(&self, category: &Category) -> DbResult<()> {
        debug!(id = %category.id, "Updating category");

        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = ?2,
                description = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", &category.id));
        }

        Ok(())
    }

    /// Deletes a category.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - products still use it
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use kiosk_core::Product;

    #[tokio::test]
    async fn test_category_round_trip() {
        let db = db().await;
        let repo = db.categories();

        let category = Category::new("Bebidas", Some("Frías y calientes".to_string()));
        repo.insert(&category).await.unwrap();

        let loaded = repo.get_by_id(&category.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Bebidas");
        assert_eq!(loaded.description.as_deref(), Some("Frías y calientes"));
        assert_eq!(loaded.created_at, category.created_at);

        let mut renamed = loaded.clone();
        renamed.name = "Bebidas frías".to_string();
        repo.update(&renamed).await.unwrap();
        let loaded = repo.get_by_id(&category.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Bebidas frías");

        repo.delete(&category.id).await.unwrap();
        assert!(repo.get_by_id(&category.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&category.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = db().await;
        let repo = db.categories();

        repo.insert(&Category::new("Snacks", None)).await.unwrap();
        let result = repo.insert(&Category::new("snacks", None)).await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_delete_in_use_category_fails() {
        let db = db().await;
        let category = Category::new("Snacks", None);
        db.categories().insert(&category).await.unwrap();
        db.products()
            .insert(&Product::new("Papas", 2000, Some(category.id.clone())))
            .await
            .unwrap();

        let result = db.categories().delete(&category.id).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = db().await;
        let repo = db.categories();
        repo.insert(&Category::new("Snacks", None)).await.unwrap();
        repo.insert(&Category::new("bebidas", None)).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["bebidas", "Snacks"]);
    }
}
