//! Test doubles shared by the integration suite: a transport that replays
//! scripted accept outcomes and a host that records every notification.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use fcgi_bridge::{
    AcceptResult, HostRuntime, StreamFlags, StreamRole, Transport, WriteError,
};

/// Shared, ordered log of transport and host activity, so tests can assert
/// cross-object ordering (e.g. env removal before the next accept).
pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn log_of(log: &EventLog) -> Vec<String> {
    log.borrow().clone()
}

pub struct ScriptedTransport {
    pub cgi: bool,
    pub accepts: VecDeque<AcceptResult>,
    pub input: Vec<u8>,
    pub read_pos: usize,
    pub written: [Vec<u8>; 3],
    pub flush_counts: [usize; 3],
    pub finishes: usize,
    pub exit_statuses: Vec<i32>,
    pub filter_result: i32,
    /// Cap on how many bytes a single transport write accepts.
    pub write_chunk: Option<usize>,
    /// Fail with this errno once the stream has accepted this many bytes.
    pub fail_write_after: Option<(usize, i32)>,
    pub flags: [StreamFlags; 3],
    log: EventLog,
}

impl ScriptedTransport {
    pub fn new(log: EventLog) -> Self {
        // The request-body stream is a reader; the other two are writers.
        let mut flags = [StreamFlags::default(); 3];
        flags[StreamRole::Input as usize].read_only = true;

        Self {
            cgi: false,
            accepts: VecDeque::new(),
            input: Vec::new(),
            read_pos: 0,
            written: Default::default(),
            flush_counts: [0; 3],
            finishes: 0,
            exit_statuses: Vec::new(),
            filter_result: 0,
            write_chunk: None,
            fail_write_after: None,
            flags,
            log,
        }
    }

    pub fn push_accept(&mut self, id: i32, env: &[&str]) {
        self.accepts
            .push_back(AcceptResult::Accepted {
                id,
                env: env.iter().map(|s| s.to_string()).collect(),
            });
    }

    pub fn push_shutdown(&mut self, code: i32) {
        self.accepts
            .push_back(AcceptResult::Shutdown(code));
    }

    pub fn written_to(&self, role: StreamRole) -> &[u8] {
        &self.written[role as usize]
    }

    pub fn flushes_of(&self, role: StreamRole) -> usize {
        self.flush_counts[role as usize]
    }
}

impl Transport for ScriptedTransport {
    fn is_cgi(&mut self) -> bool {
        self.log
            .borrow_mut()
            .push("is_cgi".to_string());
        self.cgi
    }

    fn accept(&mut self) -> AcceptResult {
        self.log
            .borrow_mut()
            .push("accept".to_string());
        self.accepts
            .pop_front()
            .unwrap_or(AcceptResult::Shutdown(-1))
    }

    fn finish(&mut self) {
        self.finishes += 1;
        self.log
            .borrow_mut()
            .push("transport finish".to_string());
    }

    fn set_exit_status(&mut self, status: i32) {
        self.exit_statuses.push(status);
    }

    fn start_filter_data(&mut self) -> i32 {
        self.log
            .borrow_mut()
            .push("start filter data".to_string());
        self.filter_result
    }

    fn stream_flags(&self, role: StreamRole) -> StreamFlags {
        self.flags[role as usize]
    }

    fn read(&mut self, role: StreamRole, buf: &mut [u8]) -> usize {
        if role != StreamRole::Input {
            return 0;
        }
        let remaining = &self.input[self.read_pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.read_pos += n;
        n
    }

    fn write(
        &mut self,
        role: StreamRole,
        buf: &[u8],
    ) -> Result<usize, WriteError> {
        let sink = &mut self.written[role as usize];
        if let Some((limit, errno)) = self.fail_write_after {
            if sink.len() >= limit {
                return Err(WriteError { errno });
            }
        }
        let n = match self.write_chunk {
            Some(chunk) => buf.len().min(chunk),
            None => buf.len(),
        };
        sink.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self, role: StreamRole) {
        self.flush_counts[role as usize] += 1;
        self.log
            .borrow_mut()
            .push(format!("flush {role}"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Set(String, String),
    Unset(String),
    Bind(StreamRole),
    Unbind(StreamRole),
}

pub struct RecordingHost {
    pub globals: Vec<(String, String)>,
    pub bound: [bool; 3],
    pub events: Vec<HostEvent>,
    log: EventLog,
}

impl RecordingHost {
    pub fn new(log: EventLog) -> Self {
        Self {
            globals: Vec::new(),
            bound: [false; 3],
            events: Vec::new(),
            log,
        }
    }

    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_bound(&self, role: StreamRole) -> bool {
        self.bound[role as usize]
    }
}

impl HostRuntime for RecordingHost {
    fn set_global(&mut self, name: &str, value: &str) {
        self.globals
            .retain(|(k, _)| k != name);
        self.globals
            .push((name.to_string(), value.to_string()));
        self.events
            .push(HostEvent::Set(name.to_string(), value.to_string()));
        self.log
            .borrow_mut()
            .push(format!("set {name}"));
    }

    fn unset_global(&mut self, name: &str) {
        self.globals.retain(|(k, _)| k != name);
        self.events
            .push(HostEvent::Unset(name.to_string()));
        self.log
            .borrow_mut()
            .push(format!("unset {name}"));
    }

    fn bind_channel(&mut self, role: StreamRole) {
        self.bound[role as usize] = true;
        self.events.push(HostEvent::Bind(role));
        self.log
            .borrow_mut()
            .push(format!("bind {}", role.channel_name()));
    }

    fn unbind_channel(&mut self, role: StreamRole) {
        self.bound[role as usize] = false;
        self.events.push(HostEvent::Unbind(role));
        self.log
            .borrow_mut()
            .push(format!("unbind {}", role.channel_name()));
    }
}
