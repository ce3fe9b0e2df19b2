/*
 * Responsibility
 * - Public interface of the middleware layer
 * - auth::permission: guard requiring a permission per route
 */
pub mod auth;
