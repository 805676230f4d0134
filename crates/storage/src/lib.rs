#![forbid(unsafe_code)]

pub mod repository;
pub mod rest;
pub mod sqlite;

pub use repository::{
    IdentityProvider, InMemoryIdentity, InMemoryLocalStore, InMemoryRemoteStore, LocalStore,
    RemotePath, RemoteStore, RemoteWrite, Storage, StorageError,
};
