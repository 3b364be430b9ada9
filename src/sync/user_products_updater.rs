use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::access::Authority;
use crate::db;
use crate::error::SyncError;
use crate::models::UserProduct;

/// Reconciles personal favorite products. Single-owner, no sharing, no
/// events: the baseline create-or-update-or-skip pattern the other
/// updaters extend.
pub struct UserProductsUpdater {
    user_id: Uuid,
}

impl UserProductsUpdater {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    pub async fn run(
        &self,
        conn: &mut SqliteConnection,
        products: &[UserProduct],
    ) -> Result<(), SyncError> {
        if products.is_empty() {
            return Ok(());
        }

        for product in products {
            if Authority::for_list(product.owner_id, self.user_id, &[]) != Authority::Owner {
                return Err(SyncError::forbidden(format!(
                    "user product {} belongs to another user",
                    product.id
                )));
            }

            let mut product = product.clone();
            product.received_at = Utc::now();

            match db::get_user_product(&mut *conn, product.id).await? {
                None => db::create_user_product(&mut *conn, &product).await?,
                Some(existing) => {
                    if existing.is_equal(&product) {
                        continue;
                    }
                    db::update_user_product(&mut *conn, &product).await?;
                }
            }
        }

        Ok(())
    }
}
