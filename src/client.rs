//! Clients, traders, and the sink capability they write through.
//!
//! A sink is host-supplied and opaque to the engine: one call per outbound
//! record, returning a transport result the engine discards after logging.
//! A [`Client`] is an observer (depth updates, snapshot replies); a
//! [`Trader`] owns order identity and additionally receives execution
//! reports and trades. Every trader is also a client.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;

use log::warn;

use crate::events::Event;
use crate::types::TraderId;

/// Host-supplied write capability. The engine never introspects it.
pub trait EventSink {
    fn send(&self, event: &Event) -> io::Result<()>;
}

impl<F> EventSink for F
where
    F: Fn(&Event) -> io::Result<()>,
{
    fn send(&self, event: &Event) -> io::Result<()> {
        self(event)
    }
}

/// An observer: identity plus sink.
pub struct Client {
    label: String,
    sink: Box<dyn EventSink>,
}

impl Client {
    pub fn new(label: impl Into<String>, sink: Box<dyn EventSink>) -> Rc<Client> {
        Rc::new(Client {
            label: label.into(),
            sink,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Deliver one event. A sink failure is logged and swallowed; the book
    /// state it reports is already committed.
    pub fn notify(&self, event: &Event) {
        if let Err(e) = self.sink.send(event) {
            warn!("client {}: dropped outbound event: {}", self.label, e);
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("label", &self.label).finish()
    }
}

/// A registered trader. Holds the strong handle on its client; resting
/// orders refer back to it only by [`TraderId`].
#[derive(Debug)]
pub struct Trader {
    id: TraderId,
    client: Rc<Client>,
}

impl Trader {
    pub fn new(id: TraderId, client: Rc<Client>) -> Trader {
        Trader { id, client }
    }

    pub fn id(&self) -> TraderId {
        self.id
    }

    pub fn client(&self) -> &Rc<Client> {
        &self.client
    }

    pub fn notify(&self, event: &Event) {
        self.client.notify(event);
    }
}

/// Sink backed by a shared in-memory buffer. Clones share the buffer; used
/// by tests and the examples in this crate's docs.
#[derive(Clone, Debug, Default)]
pub struct BufferSink {
    events: Rc<RefCell<Vec<Event>>>,
}

impl BufferSink {
    pub fn new() -> BufferSink {
        BufferSink::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// A boxed handle sharing this buffer, in the shape registration wants.
    pub fn handle(&self) -> Box<dyn EventSink> {
        Box::new(self.clone())
    }
}

impl EventSink for BufferSink {
    fn send(&self, event: &Event) -> io::Result<()> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderId;

    #[test]
    fn buffer_sink_records_in_order() {
        let buffer = BufferSink::new();
        let client = Client::new("md-1", buffer.handle());
        client.notify(&Event::new_order(OrderId(1)));
        client.notify(&Event::canceled(OrderId(1)));
        assert_eq!(
            buffer.events(),
            vec![Event::new_order(OrderId(1)), Event::canceled(OrderId(1))]
        );
        buffer.clear();
        assert!(buffer.events().is_empty());
    }

    #[test]
    fn closure_sink_works() {
        let client = Client::new("fn", Box::new(|_: &Event| -> io::Result<()> { Ok(()) }));
        client.notify(&Event::new_order(OrderId(1)));
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let client = Client::new(
            "broken",
            Box::new(|_: &Event| -> io::Result<()> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }),
        );
        // Must not panic or propagate.
        client.notify(&Event::new_order(OrderId(1)));
    }

    #[test]
    fn trader_delegates_to_its_client() {
        let buffer = BufferSink::new();
        let trader = Trader::new(TraderId(3), Client::new("t3", buffer.handle()));
        assert_eq!(trader.id(), TraderId(3));
        trader.notify(&Event::new_order(OrderId(1)));
        assert_eq!(buffer.events().len(), 1);
    }
}
