/// Closed set of console commands.
///
/// Input is parsed into this enum once and dispatched from a single match,
/// so the command surface stays exhaustively checkable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `mu` - memory, CPU, and disk stats
    MemoryUsage,
    /// `top [n]` - top processes by memory
    TopProcesses(usize),
    /// `users` - memory usage aggregated by user
    UsersMemory,
    /// `pm` - one-shot process table
    ProcessMonitor,
    /// `up` - current user's processes
    UserProcesses,
    /// `mup <pid>` - memory detail of one process
    ProcessMemory(u32),
    /// `kill <pid> [--force]`
    Kill { pid: u32, force: bool },
    /// `clean` - cache report and cleanup
    Clean,
    /// `swap` - swap status
    SwapStatus,
    /// `monitor start|stop|status`
    Monitor(MonitorAction),
    /// `clear`
    Clear,
    /// `help`
    Help,
    /// `q`
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    Start,
    Stop,
    Status,
}

const DEFAULT_TOP_N: usize = 5;

impl Command {
    /// Parse one input line. Errors carry the usage message to print.
    pub fn parse(input: &str) -> Result<Command, String> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let (cmd, args) = match parts.split_first() {
            Some((cmd, args)) => (cmd.to_lowercase(), args),
            None => return Err("Empty command".to_string()),
        };

        match (cmd.as_str(), args) {
            ("mu", []) => Ok(Command::MemoryUsage),
            ("top", []) => Ok(Command::TopProcesses(DEFAULT_TOP_N)),
            ("top", [n]) => n
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .map(Command::TopProcesses)
                .ok_or_else(|| "Usage: top [count]".to_string()),
            ("users", []) => Ok(Command::UsersMemory),
            ("pm", []) => Ok(Command::ProcessMonitor),
            ("up", []) => Ok(Command::UserProcesses),
            ("mup", [pid]) => pid
                .parse::<u32>()
                .map(Command::ProcessMemory)
                .map_err(|_| "Usage: mup <pid>".to_string()),
            ("mup", _) => Err("Usage: mup <pid>".to_string()),
            ("kill", [pid]) => pid
                .parse::<u32>()
                .map(|pid| Command::Kill { pid, force: false })
                .map_err(|_| "Usage: kill <pid> [--force]".to_string()),
            ("kill", [pid, "--force"]) => pid
                .parse::<u32>()
                .map(|pid| Command::Kill { pid, force: true })
                .map_err(|_| "Usage: kill <pid> [--force]".to_string()),
            ("kill", _) => Err("Usage: kill <pid> [--force]".to_string()),
            ("clean", []) => Ok(Command::Clean),
            ("swap", []) => Ok(Command::SwapStatus),
            ("monitor", ["start"]) => Ok(Command::Monitor(MonitorAction::Start)),
            ("monitor", ["stop"]) => Ok(Command::Monitor(MonitorAction::Stop)),
            ("monitor", ["status"]) => Ok(Command::Monitor(MonitorAction::Status)),
            ("monitor", _) => Err("Usage: monitor start|stop|status".to_string()),
            ("clear", []) => Ok(Command::Clear),
            ("help", _) | ("h", _) => Ok(Command::Help),
            ("q", _) | ("quit", _) | ("exit", _) => Ok(Command::Quit),
            _ => Err(format!(
                "Unknown command '{}'. Type 'help' for options.",
                cmd
            )),
        }
    }
}
