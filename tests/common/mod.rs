#![allow(dead_code)]

use microblog::db::Storage;
use microblog::service::{Accounts, Session};
use microblog::types::user::AccountForm;
use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

/// A SQLite file in the temp dir, removed again on drop.
pub struct TempDb {
    pub storage: Storage,
    path: PathBuf,
}

impl TempDb {
    pub async fn new(tag: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();

        let mut path = std::env::temp_dir();
        path.push(format!(
            "microblog-{tag}-{}-{}.sqlite",
            std::process::id(),
            nanos
        ));

        let database_url = format!("sqlite:{}", path.display());
        let storage = microblog::db::connect(&database_url)
            .await
            .expect("failed to open test database");
        Self { storage, path }
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.storage.clone())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}

pub fn account_form(name: &str, email: &str) -> AccountForm {
    AccountForm {
        name: name.to_string(),
        email: email.to_string(),
        password: "foobar".to_string(),
        password_confirmation: "foobar".to_string(),
    }
}

pub async fn create_user(accounts: &Accounts, name: &str, email: &str) -> Session {
    accounts
        .signup(&account_form(name, email))
        .await
        .expect("signup should succeed")
}
