// Submission → result → save workflow, plus the account and saved-feedback flows around it.
// Remote services are reached only through the gateway, identity and storage traits.

pub mod accounts;
pub mod controller;
pub mod gallery;
pub mod handlers;
pub mod presentation;
pub mod reconciler;
