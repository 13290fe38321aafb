use super::Event;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static! {
    static ref EVENT_LOGS: Mutex<HashMap<&'static str, Vec<Event>>> = Mutex::new(HashMap::new());
}

pub fn reset_events(name: &'static str) {
    let mut map = EVENT_LOGS.lock().unwrap();
    map.insert(name, Vec::new());
}

pub fn record_event(name: &'static str, event: Event) {
    let mut map = EVENT_LOGS.lock().unwrap();
    map.entry(name).or_default().push(event);
}

pub fn events(name: &str) -> Vec<Event> {
    let map = EVENT_LOGS.lock().unwrap();
    map.get(name).cloned().unwrap_or_default()
}
