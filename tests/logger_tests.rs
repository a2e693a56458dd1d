use rotating_logger::archive::{list_archives, read_lines};
use rotating_logger::{
    log_error, log_info, Entry, Level, LifecycleState, LogConfig, Logger, TerminalAction,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn quiet_config(path: &Path) -> LogConfig {
    LogConfig::new(path)
        .with_file_only(true)
        .with_flush_interval(Duration::ZERO)
}

/// Message part of a formatted line (everything after the header).
fn message_of(line: &str) -> &str {
    line.splitn(2, "] ").nth(1).unwrap_or(line)
}

#[test]
fn test_no_loss_under_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let logger = Logger::new(quiet_config(&path).with_queue_capacity(100)).unwrap();

    for i in 0..100 {
        log_info!(logger, "message {}", i);
    }
    logger.close();

    assert_eq!(logger.fallback_writes(), 0, "Queue never filled, nothing should bypass it");
    let lines = read_lines(&path).unwrap();
    let messages: Vec<_> = lines.iter().map(|l| message_of(l).to_string()).collect();
    let expected: Vec<_> = (0..100).map(|i| format!("message {}", i)).collect();
    assert_eq!(messages, expected);
}

#[test]
fn test_line_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let logger = Logger::new(quiet_config(&path).with_app_name("BOT")).unwrap();

    logger.warnf("disk at {}%", &[&91]);
    logger.info(&[&"a", &1, &true]);
    logger.close();

    let lines = read_lines(&path).unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[BOT]["), "unexpected header: {}", lines[0]);
    assert!(lines[0].ends_with("][WARN ] disk at 91%"), "unexpected line: {}", lines[0]);
    assert!(lines[1].ends_with("][INFO ] a 1 true"), "unexpected line: {}", lines[1]);

    // [BOT][YYYY/MM/DD HH:MM:SS.ffffff]
    let stamp = &lines[0][6..32];
    assert_eq!(stamp.len(), 26);
    assert_eq!(&stamp[4..5], "/");
    assert_eq!(&stamp[19..20], ".");
}

#[test]
fn test_banner_is_written_raw() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let logger = Logger::new(quiet_config(&path)).unwrap();

    logger.banner("---------- startup ----------");
    logger.close();

    assert_eq!(read_lines(&path).unwrap(), vec!["---------- startup ----------"]);
}

#[test]
fn test_rotation_scenario_five_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let logger = Logger::new(quiet_config(&path).with_max_size(120)).unwrap();

    // Trace lines are written verbatim: 39 characters plus the newline.
    let messages: Vec<String> = (1..=5).map(|i| format!("entry-{}-{}", i, "x".repeat(31))).collect();
    for message in &messages {
        assert_eq!(message.len() + 1, 40);
        logger.trace(&[message]);
    }
    logger.close();

    let writer = logger.writer().unwrap();
    assert_eq!(writer.rotations(), 1, "Only entry 4 should trigger a rotation");

    let archives = list_archives(&path).unwrap();
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].lines().unwrap(), messages[..3].to_vec());
    assert_eq!(archives[0].len().unwrap(), 120);

    let active = fs::read_to_string(&path).unwrap();
    let active: Vec<_> = active.lines().map(str::to_string).collect();
    assert_eq!(active, messages[3..].to_vec());
}

#[test]
fn test_backpressure_two_producers_capacity_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    // The terminal callback runs wherever an Error entry is written, which
    // makes the consumer slow enough to keep the one-slot queue full.
    let config = quiet_config(&path)
        .with_queue_capacity(1)
        .with_terminal_action(TerminalAction::callback(|_| {
            thread::sleep(Duration::from_millis(2))
        }));
    let logger = Arc::new(Logger::new(config).unwrap());

    let producers: Vec<_> = (0..2)
        .map(|p| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..100 {
                    log_error!(logger, "p{}-{}", p, i);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    logger.close();

    assert!(logger.fallback_writes() > 0, "Some entries should have bypassed the queue");

    let lines = read_lines(&path).unwrap();
    assert_eq!(lines.len(), 200);
    let found: HashSet<String> = lines.iter().map(|l| message_of(l).to_string()).collect();
    assert_eq!(found.len(), 200, "No entry should be duplicated");
    for p in 0..2 {
        for i in 0..100 {
            assert!(found.contains(&format!("p{}-{}", p, i)), "Missing p{}-{}", p, i);
        }
    }
}

#[test]
fn test_log_returns_while_queue_saturated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let config = quiet_config(&path)
        .with_queue_capacity(1)
        .with_terminal_action(TerminalAction::callback(|line| {
            if line.ends_with("block") {
                thread::sleep(Duration::from_millis(300));
            }
        }));
    let logger = Logger::new(config).unwrap();

    // Occupies the consumer, then fills the single queue slot.
    logger.error(&[&"block"]);
    thread::sleep(Duration::from_millis(50));
    logger.info(&[&"queued"]);

    let start = Instant::now();
    logger.info(&[&"direct"]);
    assert!(start.elapsed() < Duration::from_millis(200), "log must not wait for the consumer");
    assert_eq!(logger.fallback_writes(), 1);

    logger.close();
    let lines = read_lines(&path).unwrap();
    let messages: Vec<_> = lines.iter().map(|l| message_of(l)).collect();
    // "block" is written before its action runs; the direct write then
    // overtakes the entry still waiting in the queue.
    assert_eq!(messages, vec!["block", "direct", "queued"]);
}

#[test]
fn test_flush_waits_for_queue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let logger = Logger::new(quiet_config(&path).with_queue_capacity(1000)).unwrap();

    for i in 0..500 {
        logger.infof("flush {}", &[&i]);
    }
    logger.flush();

    assert_eq!(logger.pending(), 0);
    let lines = read_lines(&path).unwrap();
    assert_eq!(lines.len(), 500);
    assert_eq!(logger.state(), LifecycleState::Active);
}

#[test]
fn test_close_drains_and_releases_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let logger = Logger::new(quiet_config(&path).with_queue_capacity(10_000)).unwrap();

    for i in 0..2000 {
        logger.debugf("before close {}", &[&i]);
    }
    logger.close();

    assert_eq!(logger.state(), LifecycleState::Closed);
    assert!(logger.writer().unwrap().is_closed());
    assert_eq!(read_lines(&path).unwrap().len(), 2000);

    // Best effort after close: nothing reaches the file, nothing panics.
    logger.info(&[&"after close"]);
    logger.flush();
    logger.close();
    assert_eq!(read_lines(&path).unwrap().len(), 2000);
}

#[test]
fn test_drop_closes_logger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    {
        let logger = Logger::new(quiet_config(&path)).unwrap();
        logger.submit(Entry::from_parts(Level::Info, None, vec!["dropped".into()]));
    }
    let lines = read_lines(&path).unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("dropped"));
}

#[test]
fn test_terminal_callback_runs_after_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_seen = Arc::clone(&seen);
    let hook_path = path.clone();
    let config = quiet_config(&path).with_terminal_action(TerminalAction::callback(move |line| {
        let on_disk = fs::read_to_string(&hook_path).unwrap_or_default();
        hook_seen
            .lock()
            .unwrap()
            .push((line.to_string(), on_disk.contains(line)));
    }));
    let logger = Logger::new(config).unwrap();

    logger.warn(&[&"not terminal"]);
    logger.errorf("fatal: {}", &[&"disk full"]);
    logger.close();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.ends_with("[ERROR] fatal: disk full"));
    assert!(seen[0].1, "The entry should be persisted before the action runs");
}

#[test]
fn test_terminal_callback_runs_when_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_seen = Arc::clone(&seen);
    let config = quiet_config(&path).with_terminal_action(TerminalAction::callback(move |line| {
        hook_seen.lock().unwrap().push(line.to_string());
    }));
    let logger = Logger::new(config).unwrap();
    logger.close();

    // The file is released, so the write fails; the action still fires.
    logger.error(&[&"after close"]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].ends_with("[ERROR] after close"));
    assert!(read_lines(&path).unwrap().is_empty());
}

#[test]
fn test_close_races_with_producers() {
    for _ in 0..20 {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.log");
        let logger = Arc::new(Logger::new(quiet_config(&path).with_queue_capacity(64)).unwrap());

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for i in 0..500 {
                        log_info!(logger, "racing {} {}", p, i);
                    }
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(1));
        logger.close();
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(logger.pending(), 0, "No entry may be stranded in the queue");
        assert_eq!(logger.state(), LifecycleState::Closed);
    }
}

#[test]
fn test_console_only_opens_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.log");
    let config = LogConfig::new(&path)
        .with_console_only(true)
        .with_console_levels([Level::Error]);
    let logger = Logger::new(config).unwrap();

    assert!(logger.writer().is_none());
    logger.info(&[&"console only"]);
    logger.close();
    assert!(!path.exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = quiet_config(&dir.path().join("main.log")).with_queue_capacity(0);
    assert!(Logger::new(config).is_err());
}

#[test]
fn test_unopenable_path_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let result = Logger::new(quiet_config(&blocker.join("main.log")));
    assert!(result.is_err(), "Parent path is a file, construction must fail");
}

#[test]
fn test_flush_timer_stops_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let config = quiet_config(&path).with_flush_interval(Duration::from_millis(10));
    let logger = Logger::new(config).unwrap();

    for i in 0..50 {
        logger.infof("timed {}", &[&i]);
    }
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    logger.close();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(read_lines(&path).unwrap().len(), 50);
}

#[test]
fn test_rotation_through_logger_keeps_every_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.log");
    let logger = Arc::new(Logger::new(quiet_config(&path).with_max_size(2048)).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let logger = Arc::clone(&logger);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for i in 0..250 {
                    log_info!(logger, "producer {} line {}", p, i);
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    logger.close();

    let lines = read_lines(&path).unwrap();
    assert_eq!(lines.len(), counter.load(Ordering::Relaxed));
    let archives = list_archives(&path).unwrap();
    assert!(!archives.is_empty());
    assert_eq!(archives.len() as u64, logger.writer().unwrap().rotations());
}
