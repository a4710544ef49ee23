//! Tests for #[derive(Action)] macro

use aegis_macros::Action;
use chrono::{DateTime, Utc};

#[derive(Action, Clone, Debug, PartialEq)]
enum AccountAction {
    #[command]
    CreateUser {
        email: String,
    },

    #[command]
    LockUser,

    #[command]
    ChangePassword {
        new_password_hash: String,
    },

    #[event]
    UserCreated {
        id: String,
        email: String,
        timestamp: DateTime<Utc>,
    },

    #[event]
    UserLocked {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    #[event]
    PasswordChanged {
        timestamp: DateTime<Utc>,
    },
}

#[test]
fn test_is_command() {
    let action = AccountAction::CreateUser {
        email: "user@example.com".to_string(),
    };
    assert!(action.is_command());
    assert!(!action.is_event());
}

#[test]
fn test_is_event() {
    let action = AccountAction::UserCreated {
        id: "user-1".to_string(),
        email: "user@example.com".to_string(),
        timestamp: Utc::now(),
    };
    assert!(!action.is_command());
    assert!(action.is_event());
}

#[test]
fn test_event_type() {
    let action = AccountAction::UserCreated {
        id: "user-1".to_string(),
        email: "user@example.com".to_string(),
        timestamp: Utc::now(),
    };
    assert_eq!(action.event_type(), "UserCreated.v1");
}

#[test]
fn test_command_event_type() {
    let action = AccountAction::CreateUser {
        email: "user@example.com".to_string(),
    };
    // Commands don't have event types
    assert_eq!(action.event_type(), "unknown");
}

#[test]
fn test_unit_command() {
    let action = AccountAction::LockUser;
    assert!(action.is_command());
    assert!(!action.is_event());
}

#[test]
fn test_all_commands_identified() {
    let commands = vec![
        AccountAction::CreateUser {
            email: "user@example.com".to_string(),
        },
        AccountAction::LockUser,
        AccountAction::ChangePassword {
            new_password_hash: "hash".to_string(),
        },
    ];

    for cmd in commands {
        assert!(cmd.is_command(), "Expected command: {cmd:?}");
        assert!(!cmd.is_event(), "Should not be event: {cmd:?}");
    }
}

#[test]
fn test_all_events_identified() {
    let events = vec![
        AccountAction::UserCreated {
            id: "1".to_string(),
            email: "user@example.com".to_string(),
            timestamp: Utc::now(),
        },
        AccountAction::UserLocked {
            reason: "brute force".to_string(),
            timestamp: Utc::now(),
        },
        AccountAction::PasswordChanged {
            timestamp: Utc::now(),
        },
    ];

    for event in events {
        assert!(!event.is_command(), "Should not be command: {event:?}");
        assert!(event.is_event(), "Expected event: {event:?}");
    }
}

#[test]
fn test_event_types_unique() {
    let events = vec![
        (
            AccountAction::UserCreated {
                id: "1".to_string(),
                email: "user@example.com".to_string(),
                timestamp: Utc::now(),
            },
            "UserCreated.v1",
        ),
        (
            AccountAction::UserLocked {
                reason: "brute force".to_string(),
                timestamp: Utc::now(),
            },
            "UserLocked.v1",
        ),
        (
            AccountAction::PasswordChanged {
                timestamp: Utc::now(),
            },
            "PasswordChanged.v1",
        ),
    ];

    for (event, expected_type) in events {
        assert_eq!(event.event_type(), expected_type);
    }
}
