mod dispatch_ordering;
mod postgres_store;
