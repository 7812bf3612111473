//! Route paths.

pub const GET_HEALTHZ: &str = "/healthz";

pub const POST_AUTH_SIGNUP: &str = "/api/auth/signup";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_REFRESH: &str = "/api/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/api/auth/logout";
pub const POST_AUTH_FORGOT_PASSWORD: &str = "/api/auth/forgot-password";
pub const POST_AUTH_RESET_PASSWORD_TOKEN: &str = "/api/auth/reset-password/{token}";

pub const PROFILE: &str = "/api/profile";

pub const GET_ADMIN_USERS: &str = "/api/admin/users";
pub const PATCH_ADMIN_USERS_ID_ROLE: &str = "/api/admin/users/{id}/role";
pub const DELETE_ADMIN_USERS_ID: &str = "/api/admin/users/{id}";
pub const GET_ADMIN_STATS: &str = "/api/admin/stats";
