// 用户账户存储 - JSON 文件持久化
use fieldlink_shared::{UserCreate, UserProfile, UserRecord, UserUpdate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

const PROTECTED_USER: &str = "admin";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UserStoreError {
    #[error("User exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Cannot delete admin")]
    AdminProtected,
}

/// 用户账户，每次修改都会重写文件，写入失败只记录日志
pub struct UserStore {
    path: PathBuf,
    users: RwLock<BTreeMap<String, UserRecord>>,
}

impl UserStore {
    /// 加载用户文件，文件不存在或无法解析时写入默认账户
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let users = match read_users(&path).await {
            Some(users) => {
                info!("Loaded {} users from {}", users.len(), path.display());
                users
            }
            None => {
                let users = default_users();
                persist(&path, &users).await;
                info!("Seeded default users into {}", path.display());
                users
            }
        };

        Self {
            path,
            users: RwLock::new(users),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Option<UserProfile> {
        let users = self.users.read().await;
        let record = users.get(username)?;

        (record.password == password).then(|| UserProfile {
            username: username.to_string(),
            role: record.role.clone(),
        })
    }

    /// 返回用户名和角色，不包含密码
    pub async fn list(&self) -> BTreeMap<String, RoleView> {
        self.users
            .read()
            .await
            .iter()
            .map(|(name, record)| (name.clone(), RoleView { role: record.role.clone() }))
            .collect()
    }

    pub async fn add(&self, request: UserCreate) -> Result<(), UserStoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&request.username) {
            return Err(UserStoreError::UserExists);
        }

        users.insert(
            request.username,
            UserRecord {
                password: request.password,
                role: request.role,
            },
        );
        persist(&self.path, &users).await;
        Ok(())
    }

    /// 空字符串视为未提供
    pub async fn update(&self, request: UserUpdate) -> Result<(), UserStoreError> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(&request.username)
            .ok_or(UserStoreError::UserNotFound)?;

        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            record.password = password;
        }
        if let Some(role) = request.role.filter(|r| !r.is_empty()) {
            record.role = role;
        }

        persist(&self.path, &users).await;
        Ok(())
    }

    pub async fn delete(&self, username: &str) -> Result<(), UserStoreError> {
        if username == PROTECTED_USER {
            return Err(UserStoreError::AdminProtected);
        }

        let mut users = self.users.write().await;
        if users.remove(username).is_none() {
            return Err(UserStoreError::UserNotFound);
        }

        persist(&self.path, &users).await;
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub struct RoleView {
    pub role: String,
}

fn default_users() -> BTreeMap<String, UserRecord> {
    let mut users = BTreeMap::new();
    users.insert(
        "admin".to_string(),
        UserRecord {
            password: "admin123".to_string(),
            role: "admin".to_string(),
        },
    );
    users.insert(
        "user".to_string(),
        UserRecord {
            password: "user123".to_string(),
            role: "user".to_string(),
        },
    );
    users
}

async fn read_users(path: &Path) -> Option<BTreeMap<String, UserRecord>> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;

    match serde_json::from_str(&contents) {
        Ok(users) => Some(users),
        Err(e) => {
            warn!("Ignoring unreadable users file {}: {}", path.display(), e);
            None
        }
    }
}

async fn persist(path: &Path, users: &BTreeMap<String, UserRecord>) {
    let contents = match serde_json::to_string_pretty(users) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Failed to serialize users: {}", e);
            return;
        }
    };

    if let Err(e) = tokio::fs::write(path, contents).await {
        warn!("Failed to write users file {}: {}", path.display(), e);
    }
}
