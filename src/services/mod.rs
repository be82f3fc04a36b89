/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Game and guess CRUD backing the resource routes.
pub mod resource_service;
/// Connects the object store, retrying until it answers.
pub mod storage_supervisor;
