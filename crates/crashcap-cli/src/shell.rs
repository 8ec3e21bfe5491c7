use crate::cache;
use crate::command::{Command, MonitorAction};
use anyhow::Result;
use byte_unit::{Byte, UnitType};
use colored::Colorize;
use crashcap_core::{
    notifier_from_config, start_monitor, Config, Error, MemoryPressure, MonitorHandle, Notifier,
    ProcessExecutor, ProcessScanner, Sampler, SwapStatus, SystemSampler, VERSION,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type InputLines = Lines<BufReader<Stdin>>;

/// Interactive operator console.
///
/// Owns the sampler, scanner, and the (at most one) background monitor. The
/// monitor runs as its own task, so a slow sample never blocks the prompt.
pub struct Shell {
    config: Config,
    sampler: SystemSampler,
    scanner: ProcessScanner,
    notifier: Arc<dyn Notifier>,
    monitor: Option<MonitorHandle>,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        let notifier = notifier_from_config(&config.notifications);
        Self {
            config,
            sampler: SystemSampler::new(),
            scanner: ProcessScanner::new(),
            notifier,
            monitor: None,
        }
    }

    /// Main interactive loop. Returns cleanly on `q` or stdin EOF.
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();
        self.print_help();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            self.print_prompt();
            let Some(line) = lines.next_line().await? else {
                break; // EOF
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match Command::parse(line) {
                Ok(Command::Quit) => break,
                Ok(cmd) => {
                    if let Err(e) = self.dispatch(cmd, &mut lines).await {
                        println!("{}", format!("Error: {}", e).red());
                    }
                }
                Err(usage) => println!("{}", usage.red()),
            }
        }

        if let Some(handle) = self.monitor.take() {
            handle.stop().await;
            println!("{}", "Background monitor stopped.".yellow());
        }

        println!("{}", "CrashCap session ended.".green().bold());
        Ok(())
    }

    async fn dispatch(&mut self, cmd: Command, lines: &mut InputLines) -> Result<()> {
        match cmd {
            Command::MemoryUsage => self.cmd_memory_usage(),
            Command::TopProcesses(n) => self.cmd_top(n),
            Command::UsersMemory => self.cmd_users(),
            Command::ProcessMonitor => self.cmd_process_table(),
            Command::UserProcesses => self.cmd_user_processes(),
            Command::ProcessMemory(pid) => self.cmd_process_memory(pid),
            Command::Kill { pid, force } => self.cmd_kill(pid, force).await?,
            Command::Clean => self.cmd_clean(lines).await?,
            Command::SwapStatus => self.cmd_swap(),
            Command::Monitor(action) => self.cmd_monitor(action).await?,
            Command::Clear => self.cmd_clear(),
            Command::Help => self.print_help(),
            Command::Quit => unreachable!("handled by the caller"),
        }
        Ok(())
    }

    fn print_banner(&mut self) {
        println!();
        println!("{}", "CRASHCAP - System Memory Toolkit".red().bold());
        let user = self
            .scanner
            .current_user()
            .unwrap_or_else(|| "unknown".to_string());
        println!("{}", format!("v{} | Linux | user: {}", VERSION, user).dimmed());
        println!();
    }

    fn print_prompt(&self) {
        print!("{} ", "crashcap>".red().bold());
        let _ = std::io::stdout().flush();
    }

    fn print_help(&self) {
        println!("{}", "System monitoring".cyan().bold());
        println!("  {}        Show memory, CPU, and disk stats", "mu".green());
        println!("  {}   Show top processes by memory", "top [n]".green());
        println!("  {}     Show memory usage by user", "users".green());
        println!("  {}      Show swap status", "swap".green());
        println!("{}", "Process management".cyan().bold());
        println!("  {}        Show full process table", "pm".green());
        println!("  {}        List current user's processes", "up".green());
        println!("  {} Show memory usage of a process", "mup <pid>".green());
        println!(
            "  {} Terminate a process (add {} to SIGKILL)",
            "kill <pid>".green(),
            "--force".yellow()
        );
        println!("{}", "Maintenance".cyan().bold());
        println!("  {}     Report and clean system caches", "clean".green());
        println!(
            "  {} Background memory monitor",
            "monitor start|stop|status".green()
        );
        println!("  {}     Clear screen", "clear".green());
        println!("  {}      Show this help", "help".green());
        println!("  {}         Quit", "q".green());
        println!();
    }

    // ===== mu =====

    fn cmd_memory_usage(&mut self) {
        let snapshot = match self.sampler.sample() {
            Ok(s) => s,
            Err(e) => {
                println!("{}", format!("Sampling failed: {}", e).red());
                return;
            }
        };

        println!("{}", "Memory".cyan().bold());
        println!(
            "  Used:      {} / {} ({:.1}%)",
            fmt_bytes(snapshot.used_bytes),
            fmt_bytes(snapshot.total_bytes),
            snapshot.used_percent
        );
        println!("  Available: {}", fmt_bytes(snapshot.available_bytes));
        println!("  Swap used: {:.1}%", snapshot.swap_used_percent);

        let load = sysinfo::System::load_average();
        println!("{}", "CPU".yellow().bold());
        println!(
            "  Usage: {:.1}%  Cores: {}  Load: {:.2} {:.2} {:.2}",
            snapshot.cpu_percent,
            self.sampler.cpu_count(),
            load.one,
            load.five,
            load.fifteen
        );

        println!("{}", "Disk".magenta().bold());
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mut shown = false;
        for disk in disks.list() {
            if disk.mount_point() == std::path::Path::new("/") {
                let total = disk.total_space();
                let used = total.saturating_sub(disk.available_space());
                let pct = if total > 0 {
                    used as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                println!(
                    "  Root: {} / {} ({:.1}%)",
                    fmt_bytes(used),
                    fmt_bytes(total),
                    pct
                );
                shown = true;
            }
        }
        if !shown {
            println!("  {}", "Root filesystem not found".yellow());
        }

        match MemoryPressure::read() {
            Ok(p) => println!(
                "  Pressure: {} (some avg10 {:.2}%)",
                p.status(),
                p.some_avg10
            ),
            Err(_) => println!("  Pressure: {}", "not available".dimmed()),
        }
    }

    // ===== top =====

    fn cmd_top(&mut self, n: usize) {
        let procs = self.scanner.top_by_memory(n);
        println!(
            "{}",
            format!("Top {} processes by memory", procs.len()).cyan().bold()
        );
        print_process_table(&procs);
    }

    // ===== users =====

    fn cmd_users(&mut self) {
        let mut by_user: Vec<(String, u64)> = self.scanner.memory_by_user().into_iter().collect();
        by_user.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        println!("{}", "Memory usage by user".cyan().bold());
        println!("{}", format!("{:<16} {:>12}", "USER", "MEMORY").dimmed());
        for (user, bytes) in by_user {
            println!("{:<16} {:>12}", user.green(), fmt_bytes(bytes));
        }
    }

    // ===== pm =====

    fn cmd_process_table(&mut self) {
        const MAX_ROWS: usize = 30;

        let all = self.scanner.list_processes();
        let total = all.len();
        let ranked = crashcap_core::rank_by_memory(all, MAX_ROWS);

        println!(
            "{}",
            format!("Processes ({} running, top {} by memory)", total, ranked.len())
                .cyan()
                .bold()
        );
        print_process_table(&ranked);
    }

    // ===== up =====

    fn cmd_user_processes(&mut self) {
        let Some(user) = self.scanner.current_user() else {
            println!("{}", "Could not resolve the current user.".red());
            return;
        };

        let procs = self.scanner.processes_for_user(&user);
        println!(
            "{}",
            format!("Processes for user {} ({})", user, procs.len())
                .cyan()
                .bold()
        );
        print_process_table(&procs);
    }

    // ===== mup =====

    fn cmd_process_memory(&mut self, pid: u32) {
        match self.scanner.memory_detail(pid) {
            Ok(detail) => {
                println!(
                    "{}",
                    format!("PID {} - {}", detail.pid, detail.name).cyan().bold()
                );
                println!("  RSS:      {}", fmt_bytes(detail.rss_bytes));
                println!("  Virtual:  {}", fmt_bytes(detail.virtual_bytes));
                println!("  Memory:   {:.2}%", detail.memory_percent);
                println!("  CPU:      {:.1}%", detail.cpu_percent);
                println!(
                    "  Runtime:  {}",
                    humantime::format_duration(Duration::from_secs(detail.run_time_secs))
                );
            }
            Err(Error::NotFound(_)) => {
                println!("{}", format!("Process {} not found.", pid).red())
            }
            Err(e) => println!("{}", format!("Error: {}", e).red()),
        }
    }

    // ===== kill =====

    async fn cmd_kill(&mut self, pid: u32, force: bool) -> Result<()> {
        match ProcessExecutor::terminate(pid, force) {
            Ok(()) if force => {
                println!("{}", format!("Process {} killed (SIGKILL).", pid).red());
            }
            Ok(()) => {
                println!("{}", format!("Sent SIGTERM to process {}.", pid).yellow());

                let exited = tokio::task::spawn_blocking(move || {
                    ProcessExecutor::wait_for_exit(pid, Duration::from_secs(2))
                })
                .await??;

                if exited {
                    println!("{}", format!("Process {} exited.", pid).green());
                } else {
                    println!(
                        "{}",
                        format!(
                            "Process {} is still running. Use kill {} --force to SIGKILL.",
                            pid, pid
                        )
                        .yellow()
                    );
                }
            }
            Err(Error::NotFound(_)) => {
                println!("{}", format!("Process {} not found.", pid).red());
            }
            Err(e) => println!("{}", format!("{}", e).red()),
        }
        Ok(())
    }

    // ===== clean =====

    async fn cmd_clean(&mut self, lines: &mut InputLines) -> Result<()> {
        let paths = cache::default_cache_paths();

        println!("{}", "Cache locations".cyan().bold());
        let mut total = 0u64;
        for p in &paths {
            let size = cache::dir_size(&p.path);
            total += size;
            println!(
                "  {:<22} {:>10}  {}",
                p.name,
                fmt_bytes(size),
                p.path.display().to_string().dimmed()
            );
        }
        println!("  Total reclaimable: {}", fmt_bytes(total).bold());

        print!(
            "{} ",
            "Delete the contents of these directories? [y/N]".yellow()
        );
        let _ = std::io::stdout().flush();

        let answer = lines.next_line().await?.unwrap_or_default();
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }

        for p in &paths {
            let outcome = cache::clean_dir(&p.path);
            println!(
                "  {:<22} removed {} entries ({})",
                p.name,
                outcome.removed_entries,
                fmt_bytes(outcome.removed_bytes)
            );
            if outcome.failed_entries > 0 {
                let hint = if p.needs_root {
                    " Try elevated privileges."
                } else {
                    ""
                };
                println!(
                    "  {}",
                    format!(
                        "{} entries could not be removed (in use or permission denied).{}",
                        outcome.failed_entries, hint
                    )
                    .yellow()
                );
            }
        }
        Ok(())
    }

    // ===== swap =====

    fn cmd_swap(&mut self) {
        match SwapStatus::read() {
            Ok(status) if status.is_empty() => {
                println!("{}", "No active swap found.".yellow());
            }
            Ok(status) => {
                println!("{}", "Active swap".cyan().bold());
                println!(
                    "{}",
                    format!(
                        "{:<32} {:<10} {:>10} {:>10} {:>9}",
                        "DEVICE", "TYPE", "SIZE", "USED", "PRIORITY"
                    )
                    .dimmed()
                );
                for d in &status.devices {
                    println!(
                        "{:<32} {:<10} {:>10} {:>10} {:>9}",
                        d.filename,
                        d.kind,
                        fmt_bytes(d.size_kib * 1024),
                        fmt_bytes(d.used_kib * 1024),
                        d.priority
                    );
                }
                println!(
                    "Total: {} | Used: {} | Free: {}",
                    fmt_bytes(status.total_kib() * 1024),
                    fmt_bytes(status.used_kib() * 1024),
                    fmt_bytes(status.free_kib() * 1024)
                );
            }
            Err(e) => println!("{}", format!("Failed to read swap status: {}", e).red()),
        }
    }

    // ===== monitor =====

    async fn cmd_monitor(&mut self, action: MonitorAction) -> Result<()> {
        match action {
            MonitorAction::Start => {
                if self.monitor.as_ref().map(|h| h.is_running()).unwrap_or(false) {
                    println!("{}", "Monitor is already running.".yellow());
                    return Ok(());
                }

                let handle = start_monitor(&self.config.monitor, self.notifier.clone())?;
                self.monitor = Some(handle);
                println!(
                    "{}",
                    format!(
                        "Memory monitor started (threshold {:.0}%, every {}s).",
                        self.config.monitor.memory_threshold,
                        self.config.monitor.check_interval_secs
                    )
                    .green()
                );
            }
            MonitorAction::Stop => match self.monitor.take() {
                Some(handle) => {
                    let status = handle.status();
                    handle.stop().await;
                    println!(
                        "{}",
                        format!(
                            "Monitor stopped after {} ticks ({} alerts, {} recoveries).",
                            status.stats.total_ticks,
                            status.stats.alerts_raised,
                            status.stats.recoveries
                        )
                        .yellow()
                    );
                }
                None => println!("{}", "Monitor is not running.".red()),
            },
            MonitorAction::Status => match &self.monitor {
                Some(handle) if handle.is_running() => {
                    let status = handle.status();
                    let state = if status.is_alerting() {
                        "ALERTING".red().bold()
                    } else {
                        "normal".green()
                    };
                    println!("Monitor running, state: {}", state);
                    if let Some(pct) = status.last_used_percent {
                        println!("  Last reading: {:.1}%", pct);
                    }
                    if let Some(at) = status.last_transition {
                        println!("  Last transition: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                    println!(
                        "  Ticks: {} | Failed samples: {} | Alerts: {} | Recoveries: {}",
                        status.stats.total_ticks,
                        status.stats.failed_samples,
                        status.stats.alerts_raised,
                        status.stats.recoveries
                    );
                }
                _ => println!("{}", "Monitor is not running.".red()),
            },
        }
        Ok(())
    }

    fn cmd_clear(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
        self.print_banner();
    }
}

fn print_process_table(procs: &[crashcap_core::ProcessInfo]) {
    println!(
        "{}",
        format!(
            "{:>8} {:>10} {:>6} {:>6}  {:<12} {}",
            "PID", "MEMORY", "MEM%", "CPU%", "USER", "NAME"
        )
        .dimmed()
    );
    for p in procs {
        println!(
            "{:>8} {:>10} {:>5.1}% {:>5.1}%  {:<12} {}",
            p.pid,
            fmt_bytes(p.memory_bytes),
            p.memory_percent,
            p.cpu_percent,
            p.user,
            p.name
        );
    }
}

fn fmt_bytes(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.2}", adjusted)
}
