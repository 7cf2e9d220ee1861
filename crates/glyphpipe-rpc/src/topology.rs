//! Pipe setup and role split between the producer and consumer.
//!
//! Two unidirectional pipes connect the roles:
//!
//! ```text
//!   producer (renderer)                 consumer (rasterizer)
//!   writer ── to_consumer ──────────▶   reader
//!   reader ◀──────────── to_producer ── writer
//! ```
//!
//! Every pipe end is owned by exactly one [`Endpoint`]. Ends a role does not
//! own are closed right after the split (or right after the fork in the
//! child), so closing a role's endpoint is always visible to its peer as EOF.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use glyphpipe_transport::{
    exit_child, fork, pipe_pair, ChildProcess, Fork, PipePair, PipeReader, PipeWriter,
    TransportError,
};
use tracing::{debug, error, info};

use crate::error::{Result, RpcError};

/// Exit status of a forked role that panicked.
const PANIC_EXIT_CODE: i32 = 101;

/// Which side of the session a role plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleKind {
    /// Owns fonts and answers glyph requests.
    #[default]
    Producer,
    /// Replays the drawing payload and issues glyph requests.
    Consumer,
}

impl RoleKind {
    pub fn name(self) -> &'static str {
        match self {
            RoleKind::Producer => "producer",
            RoleKind::Consumer => "consumer",
        }
    }

    fn other(self) -> RoleKind {
        match self {
            RoleKind::Producer => RoleKind::Consumer,
            RoleKind::Consumer => RoleKind::Producer,
        }
    }
}

/// The read end and write end owned by one role.
#[derive(Debug)]
pub struct Endpoint {
    pub reader: PipeReader,
    pub writer: PipeWriter,
}

impl Endpoint {
    pub fn into_parts(self) -> (PipeReader, PipeWriter) {
        (self.reader, self.writer)
    }
}

/// One role together with the only pipe ends it may use.
#[derive(Debug)]
pub enum Role {
    Producer(Endpoint),
    Consumer(Endpoint),
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Producer(_) => RoleKind::Producer,
            Role::Consumer(_) => RoleKind::Consumer,
        }
    }

    pub fn into_endpoint(self) -> Endpoint {
        match self {
            Role::Producer(endpoint) | Role::Consumer(endpoint) => endpoint,
        }
    }
}

/// How the second role is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchMode {
    /// Fork a child process.
    #[default]
    Process,
    /// Spawn a thread in this process.
    Thread,
}

/// Session launch options.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchConfig {
    pub mode: LaunchMode,
    /// Role run by the calling process or thread. The other role is started
    /// according to `mode`.
    pub parent: RoleKind,
}

/// Work run by one role. Receives the role's endpoint by value; dropping it
/// closes both of the role's pipe ends.
type RoleFn = Box<dyn FnOnce(Endpoint) -> Result<()> + Send>;

/// The two pipe pairs of one session, before the role split.
#[derive(Debug)]
pub struct Topology {
    to_consumer: PipePair,
    to_producer: PipePair,
}

impl Topology {
    /// Create both pipes.
    pub fn new() -> Result<Self> {
        let to_consumer = pipe_pair()?;
        let to_producer = pipe_pair()?;
        debug!(?to_consumer, ?to_producer, "created session pipes");
        Ok(Self {
            to_consumer,
            to_producer,
        })
    }

    /// Hand each role exactly the ends it owns.
    pub fn split(self) -> (Role, Role) {
        let producer = Endpoint {
            reader: self.to_producer.reader,
            writer: self.to_consumer.writer,
        };
        let consumer = Endpoint {
            reader: self.to_consumer.reader,
            writer: self.to_producer.writer,
        };
        (Role::Producer(producer), Role::Consumer(consumer))
    }

    /// Run both roles to completion.
    ///
    /// The caller runs `config.parent`'s function; the other role runs in a
    /// forked child or a spawned thread. After both finish, an error from the
    /// caller's own role is returned first; otherwise a failure of the other
    /// role is reported as [`RpcError::RoleFailed`].
    ///
    /// With [`LaunchMode::Process`] the caller should be single-threaded: the
    /// child starts with only the forking thread, and locks held elsewhere at
    /// fork time stay held in the child.
    pub fn launch<F, G>(self, config: LaunchConfig, producer: F, consumer: G) -> Result<()>
    where
        F: FnOnce(Endpoint) -> Result<()> + Send + 'static,
        G: FnOnce(Endpoint) -> Result<()> + Send + 'static,
    {
        let (producer_role, consumer_role) = self.split();
        let producer: (Role, RoleFn) = (producer_role, Box::new(producer));
        let consumer: (Role, RoleFn) = (consumer_role, Box::new(consumer));
        let (own, other) = match config.parent {
            RoleKind::Producer => (producer, consumer),
            RoleKind::Consumer => (consumer, producer),
        };

        info!(
            mode = ?config.mode,
            parent = config.parent.name(),
            child = config.parent.other().name(),
            "launching session"
        );
        match config.mode {
            LaunchMode::Process => launch_process(own, other),
            LaunchMode::Thread => launch_thread(own, other),
        }
    }
}

fn launch_process(own: (Role, RoleFn), other: (Role, RoleFn)) -> Result<()> {
    // SAFETY: the child only runs `other`'s function and then leaves through
    // `exit_child`; single-threaded callers are documented on `launch`.
    match unsafe { fork() }? {
        Fork::Child => {
            drop(own);
            let (role, work) = other;
            exit_child(run_child(role, work))
        }
        Fork::Parent(child) => {
            let (role, work) = own;
            let child_kind = other.0.kind();
            drop(other);
            let outcome = work(role.into_endpoint());
            finish_process(child, child_kind, outcome)
        }
    }
}

/// Run a role inside a forked child and turn the outcome into an exit status.
fn run_child(role: Role, work: RoleFn) -> i32 {
    let kind = role.kind();
    match panic::catch_unwind(AssertUnwindSafe(|| work(role.into_endpoint()))) {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            error!(role = kind.name(), error = %err, "role failed");
            1
        }
        Err(_) => PANIC_EXIT_CODE,
    }
}

fn finish_process(mut child: ChildProcess, kind: RoleKind, outcome: Result<()>) -> Result<()> {
    let exit = child.wait();
    outcome?;
    let exit = exit?;
    info!(role = kind.name(), pid = child.pid(), %exit, "child role finished");
    if exit.success() {
        Ok(())
    } else {
        Err(RpcError::RoleFailed {
            role: kind.name(),
            reason: exit.to_string(),
        })
    }
}

fn launch_thread(own: (Role, RoleFn), other: (Role, RoleFn)) -> Result<()> {
    let (child_role, child_work) = other;
    let kind = child_role.kind();
    let handle = thread::Builder::new()
        .name(format!("glyphpipe-{}", kind.name()))
        .spawn(move || child_work(child_role.into_endpoint()))
        .map_err(TransportError::Io)?;

    let (role, work) = own;
    let outcome = work(role.into_endpoint());
    let joined = handle.join();
    outcome?;

    info!(role = kind.name(), "thread role finished");
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(RpcError::RoleFailed {
            role: kind.name(),
            reason: err.to_string(),
        }),
        Err(_) => Err(RpcError::RoleFailed {
            role: kind.name(),
            reason: "panicked".to_string(),
        }),
    }
}
