use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;

use crate::models::{
    auth::Claims,
    user::{LoginResponse, RegisterRequest, User, UserProfile},
};

const MIN_PASSWORD_LEN: usize = 5;
const BCRYPT_COST: u32 = 12;

const USER_COLUMNS: &str =
    "id, username, password_hash, name, is_active, is_staff, created_at, updated_at";

pub struct AuthService;

impl AuthService {
    /// Create a regular (non-staff) account.
    pub async fn register(pool: &PgPool, req: &RegisterRequest) -> anyhow::Result<UserProfile> {
        let username = req.username.trim();
        validate_credentials(username, &req.password)?;

        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;
        if taken {
            anyhow::bail!("A user with that username already exists");
        }

        let hash = bcrypt::hash(&req.password, BCRYPT_COST)?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, name)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(hash)
        .bind(req.name.trim())
        .fetch_one(pool)
        .await?;

        tracing::info!("Registered user '{}'", user.username);
        Ok(user.into())
    }

    /// Validate credentials and issue an access token.
    pub async fn login(
        pool: &PgPool,
        username: &str,
        password: &str,
        jwt_secret: &str,
        access_ttl: u64,
    ) -> anyhow::Result<LoginResponse> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active = TRUE"
        ))
        .bind(username.trim())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Invalid credentials"))?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| anyhow::anyhow!("Invalid credentials"))?;
        if !valid {
            anyhow::bail!("Invalid credentials");
        }

        let token = Self::generate_access_token(&user, jwt_secret, access_ttl)?;
        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn profile(pool: &PgPool, user_id: uuid::Uuid) -> anyhow::Result<Option<UserProfile>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(user.map(UserProfile::from))
    }

    /// Create a staff account, or promote and re-password an existing one.
    pub async fn upsert_staff(
        pool: &PgPool,
        username: &str,
        password: &str,
        name: &str,
    ) -> anyhow::Result<User> {
        let username = username.trim();
        validate_credentials(username, password)?;
        let hash = bcrypt::hash(password, BCRYPT_COST)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, name, is_staff)
             VALUES ($1, $2, $3, TRUE)
             ON CONFLICT (username) DO UPDATE SET
                 password_hash = EXCLUDED.password_hash,
                 is_staff = TRUE,
                 is_active = TRUE,
                 updated_at = NOW()
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(hash)
        .bind(name)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    pub fn generate_access_token(
        user: &User,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            is_staff: user.is_staff,
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }
}

fn validate_credentials(username: &str, password: &str) -> anyhow::Result<()> {
    if username.is_empty() {
        anyhow::bail!("Username is required");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        anyhow::bail!("Password must be at least {MIN_PASSWORD_LEN} characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_access_token;
    use uuid::Uuid;

    fn sample_user(is_staff: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "testuser30".into(),
            password_hash: String::new(),
            name: "Test".into(),
            is_active: true,
            is_staff,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let user = sample_user(true);
        let token = AuthService::generate_access_token(&user, "secret", 60).unwrap();
        let decoded = decode_access_token(&token, "secret").unwrap();

        assert_eq!(decoded.user_id, user.id);
        assert_eq!(decoded.username, "testuser30");
        assert!(decoded.is_staff);
    }

    #[test]
    fn test_access_token_wrong_secret() {
        let token = AuthService::generate_access_token(&sample_user(false), "secret", 60).unwrap();
        assert!(decode_access_token(&token, "other").is_err());
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials("ana", "test123.@1").is_ok());
        assert!(validate_credentials("", "test123.@1").is_err());
        assert!(validate_credentials("ana", "1234").is_err());
    }
}
