//! Defined `requestType` codes (§4.4).

pub const REGISTER: i64 = 0;
pub const REQUEST: i64 = 1;
pub const RESTART: i64 = 2;
pub const STOPREMOTE: i64 = 3;
pub const CLOSE: i64 = 4;
pub const SERVER_REGISTER: i64 = 5;
pub const SERVER_LOGIN: i64 = 6;
pub const PROCESS_LOGIN: i64 = 7;
pub const PROCESS_LOGOUT: i64 = 9;
pub const GAME_START: i64 = 11;
pub const GAME_STOP: i64 = 12;
pub const USER_REQUEST_BY_GAME_TYPE: i64 = 13;

pub fn name(request_type: i64) -> &'static str {
    match request_type {
        REGISTER => "REGISTER",
        REQUEST => "REQUEST",
        RESTART => "RESTART",
        STOPREMOTE => "STOPREMOTE",
        CLOSE => "CLOSE",
        SERVER_REGISTER => "SERVER_REGISTER",
        SERVER_LOGIN => "SERVER_LOGIN",
        PROCESS_LOGIN => "PROCESS_LOGIN",
        PROCESS_LOGOUT => "PROCESS_LOGOUT",
        GAME_START => "GAME_START",
        GAME_STOP => "GAME_STOP",
        USER_REQUEST_BY_GAME_TYPE => "USER_REQUEST_BY_GAME_TYPE",
        _ => "UNKNOWN",
    }
}

/// `true` for request types that need a leased transactional connection
/// (§4.4's `needs_tx`). Only the allocator does.
pub fn needs_tx(request_type: i64) -> bool {
    request_type == PROCESS_LOGIN
}
