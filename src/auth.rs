//! bcrypt hashing, run on the blocking pool.

use tokio::task::spawn_blocking;

use crate::error::AppResult;

/// Hash a plaintext password before it is written to the `user` table.
pub async fn hash_password(plain: String, cost: u32) -> AppResult<String> {
    Ok(spawn_blocking(move || bcrypt::hash(plain, cost)).await??)
}

pub async fn verify_password(plain: String, hash: String) -> AppResult<bool> {
    Ok(spawn_blocking(move || bcrypt::verify(plain, &hash)).await??)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("hunter2".into(), 4).await.unwrap();
        assert_ne!(hash, "hunter2");
        assert!(hash.starts_with("$2"));

        assert!(verify_password("hunter2".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("hunter3".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_cost_is_an_error() {
        assert!(hash_password("pw".into(), 1).await.is_err());
    }
}
