//! SQLite fixtures on temporary database files.

use std::sync::Arc;

use serde::Deserialize;
use tempfile::TempDir;

use sqlweave::backends::sqlite::SqliteDriver;
use sqlweave::driver::{Connection, Driver};
use sqlweave::types::SqlParam;

/// Teams users are assigned to, round robin.
pub const TEAMS: [&str; 3] = ["red", "green", "blue"];

/// A database file that lives as long as the fixture.
pub struct SqliteFixture {
    pub driver: Arc<SqliteDriver>,
    _dir: TempDir,
}

/// Creates an empty database in a fresh temporary directory.
pub fn sqlite_fixture() -> SqliteFixture {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let driver = SqliteDriver::open(dir.path().join("test.db"))
        .expect("Failed to create SQLite driver");
    SqliteFixture {
        driver: Arc::new(driver),
        _dir: dir,
    }
}

/// Creates the users table.
pub async fn create_users_table(driver: &SqliteDriver) {
    driver
        .execute_raw(
            "CREATE TABLE users (
                user_id INTEGER PRIMARY KEY,
                user_name TEXT NOT NULL,
                team TEXT NOT NULL,
                age INTEGER NOT NULL,
                addr_city TEXT,
                avatar BLOB
            )",
        )
        .await
        .expect("Failed to create users table");
}

/// Creates the users table and inserts `count` users.
///
/// User `i` is named `user_{i:02}`, is `20 + i` years old, belongs to
/// `TEAMS[i % 3]` and lives in `City{i}` when `i` is even, nowhere otherwise.
pub async fn seed_users(driver: &SqliteDriver, count: i64) {
    create_users_table(driver).await;

    let mut conn = driver.acquire().await.expect("Failed to acquire connection");
    conn.begin().await.expect("Failed to begin");
    for i in 1..=count {
        let city = if i % 2 == 0 {
            SqlParam::Text(format!("City{}", i))
        } else {
            SqlParam::Null
        };
        conn.execute(
            "INSERT INTO users (user_id, user_name, team, age, addr_city) VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                SqlParam::Integer(i),
                SqlParam::Text(format!("user_{:02}", i)),
                SqlParam::text(TEAMS[(i % 3) as usize]),
                SqlParam::Integer(20 + i),
                city,
            ],
        )
        .await
        .expect("Failed to insert user");
    }
    conn.commit().await.expect("Failed to commit");
    conn.release().await.expect("Failed to release");
}

/// A user row with the city mapped to a nested address.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub user_name: String,
    pub team: String,
    pub age: i64,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Address {
    pub city: String,
}
