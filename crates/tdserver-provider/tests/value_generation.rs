//! Hi-lo value generation and the shared sequence-state cache.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tdserver_provider::error::Result;
use tdserver_provider::metadata::{Property, Sequence};
use tdserver_provider::value_generation::{
    GeneratedValue, SequenceValueGeneratorFactory, ValueGenerator, ValueGeneratorCache,
};
use tdserver_provider::{ClrType, DatabaseConnection, DatabaseSession, Model, ModelBuilder, ProviderConfig, ProviderError, ProviderServices};
use tokio_util::sync::CancellationToken;

/// Sequence backed by a counter; every `NEXT VALUE FOR` advances by the increment.
struct SequenceConnection {
    next: Arc<AtomicI64>,
    increment: i64,
    reservations: Arc<AtomicUsize>,
}

impl SequenceConnection {
    fn new(increment: i64) -> Self {
        Self {
            next: Arc::new(AtomicI64::new(1)),
            increment,
            reservations: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct SequenceSession {
    next: Arc<AtomicI64>,
    increment: i64,
    reservations: Arc<AtomicUsize>,
}

#[async_trait]
impl DatabaseSession for SequenceSession {
    async fn execute_non_query(&mut self, _sql: &str) -> Result<u64> {
        Ok(0)
    }

    async fn execute_scalar(&mut self, sql: &str) -> Result<Option<i64>> {
        assert_eq!(sql, "SELECT NEXT VALUE FOR [EntityFrameworkHiLoSequence]");
        self.reservations.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent callers interleave with the reservation.
        tokio::task::yield_now().await;
        Ok(Some(self.next.fetch_add(self.increment, Ordering::SeqCst)))
    }
}

#[async_trait]
impl DatabaseConnection for SequenceConnection {
    fn database(&self) -> &str {
        "Shop"
    }

    fn data_source(&self) -> &str {
        "td1,1433"
    }

    fn command_timeout(&self) -> Option<Duration> {
        None
    }

    async fn open(&self) -> Result<Box<dyn DatabaseSession>> {
        Ok(Box::new(SequenceSession {
            next: Arc::clone(&self.next),
            increment: self.increment,
            reservations: Arc::clone(&self.reservations),
        }))
    }

    fn clear_pool(&self) {}

    fn clear_all_pools(&self) {}

    fn create_master_connection(&self) -> Arc<dyn DatabaseConnection> {
        Arc::new(SequenceConnection::new(self.increment))
    }
}

fn hilo_model() -> Model {
    let mut builder = ModelBuilder::new();
    builder.use_sequence_hilo(None, None);
    {
        let mut order = builder.entity("Order");
        order.property("Id", ClrType::Int32).unwrap();
        order.property("Reference", ClrType::Guid).unwrap().value_generated_on_add().unwrap();
        order.has_key(&["Id"]).unwrap();
    }
    builder.finalize().unwrap()
}

fn services(connection: Arc<SequenceConnection>) -> ProviderServices {
    let config = ProviderConfig::from_yaml("connection:\n  host: td1\n  user: dbc\n  database: Shop\n").unwrap();
    ProviderServices::with_connection(config, connection).unwrap()
}

#[tokio::test]
async fn test_concurrent_hilo_values_are_unique() {
    let connection = Arc::new(SequenceConnection::new(10));
    let services = services(Arc::clone(&connection));
    let model = hilo_model();
    let order = model.entity("Order").unwrap();
    let id = order.property("Id").unwrap();

    let generator = match services.value_generator_selector().select(&model, order, id).unwrap() {
        Some(ValueGenerator::HiLo(generator)) => Arc::new(generator),
        _ => panic!("expected a hi-lo generator for Order.Id"),
    };
    assert!(!generator.generates_temporary_values());

    let mut handles = Vec::new();
    for _ in 0..25 {
        let generator = Arc::clone(&generator);
        handles.push(tokio::spawn(async move {
            generator.next_value_async(&CancellationToken::new()).await.unwrap()
        }));
    }
    let mut values = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            GeneratedValue::Int32(v) => values.push(v),
            other => panic!("unexpected value {:?}", other),
        }
    }
    values.sort_unstable();

    assert_eq!(values, (1..=25).collect::<Vec<_>>());
    assert_eq!(connection.reservations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_generators_share_sequence_state() {
    let connection = Arc::new(SequenceConnection::new(10));
    let services = services(Arc::clone(&connection));
    let model = hilo_model();
    let order = model.entity("Order").unwrap();
    let id = order.property("Id").unwrap();
    let selector = services.value_generator_selector();

    let first = selector.select(&model, order, id).unwrap().unwrap();
    let second = selector.select(&model, order, id).unwrap().unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(first.next_value_async(&cancel).await.unwrap(), GeneratedValue::Int32(1));
    assert_eq!(second.next_value_async(&cancel).await.unwrap(), GeneratedValue::Int32(2));
    assert_eq!(services.value_generator_cache().len(), 1);
    assert_eq!(connection.reservations.load(Ordering::SeqCst), 1);
}

#[test]
fn test_guid_key_gets_sequential_guids() {
    let services = services(Arc::new(SequenceConnection::new(10)));
    let model = hilo_model();
    let order = model.entity("Order").unwrap();
    let reference = order.property("Reference").unwrap();

    let generator = services.value_generator_selector().select(&model, order, reference).unwrap();
    let Some(generator @ ValueGenerator::SequentialGuid(_)) = generator else {
        panic!("expected a sequential GUID generator");
    };
    assert_ne!(generator.next_value().unwrap(), generator.next_value().unwrap());
}

#[test]
fn test_concurrent_cache_creates_one_state() {
    let cache = Arc::new(ValueGeneratorCache::new());
    let connection = Arc::new(SequenceConnection::new(10));
    let mut sequence = Sequence::new("OrderNumbers", Some("sales"));
    sequence.increment_by = 10;
    let sequence = Arc::new(sequence);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let connection = Arc::clone(&connection);
            let sequence = Arc::clone(&sequence);
            thread::spawn(move || {
                cache
                    .get_or_add_sequence_state(&sequence, connection.as_ref())
                    .unwrap()
            })
        })
        .collect();
    let states: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.len(), 1);
    assert!(states.iter().all(|s| Arc::ptr_eq(s, &states[0])));
    assert_eq!(states[0].block_size(), 10);
    assert_eq!(
        ValueGeneratorCache::sequence_key(&sequence, "shop", "td1,1433"),
        "SHOP::TD1,1433::sales.OrderNumbers"
    );
}

#[test]
fn test_factory_rejects_non_integer_property() {
    let cache = ValueGeneratorCache::new();
    let connection = Arc::new(SequenceConnection::new(10));
    let state = cache
        .get_or_add_sequence_state(&Sequence::new("Codes", None), connection.as_ref())
        .unwrap();
    let property = Property::new("Code", ClrType::String);

    let err = SequenceValueGeneratorFactory::default()
        .create("Product", &property, state, connection)
        .err()
        .unwrap();

    assert!(matches!(
        err,
        ProviderError::InvalidValueGeneratorFactoryProperty { ref property, ref entity, .. }
            if property == "Code" && entity == "Product"
    ));
}
