//! Tests for #[derive(State)] macro

use aegis_macros::State;

#[derive(State, Clone, Debug)]
struct AccountState {
    pub id: Option<String>,
    pub email: String,
    pub locked: bool,
    #[version]
    pub version: i64,
}

#[derive(State, Clone, Debug)]
struct SimpleState {
    pub count: i32,
}

#[test]
fn test_version_accessor() {
    let state = AccountState {
        id: Some("user-1".to_string()),
        email: "a@example.com".to_string(),
        locked: false,
        version: 5,
    };

    assert_eq!(state.version(), 5);
}

#[test]
fn test_set_version() {
    let mut state = AccountState {
        id: Some("user-1".to_string()),
        email: "a@example.com".to_string(),
        locked: false,
        version: 0,
    };

    assert_eq!(state.version(), 0);

    state.set_version(10);
    assert_eq!(state.version(), 10);
}

#[test]
fn test_version_increments_on_update() {
    let mut state = AccountState {
        id: None,
        email: String::new(),
        locked: false,
        version: 1,
    };

    state.set_version(state.version() + 1);
    assert_eq!(state.version(), 2);
}

#[test]
fn test_state_without_version() {
    // SimpleState doesn't have #[version], so it should compile
    // but not have version() and set_version() methods
    let _state = SimpleState { count: 0 };
}
