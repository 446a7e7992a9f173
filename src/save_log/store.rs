// src/save_log/store.rs

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::model::{
    SaveEvent, SaveEventClass, LOAD_TAIL_LINES, LOG_BACKUP_NAME, LOG_FILE_NAME, MAX_LOG_BYTES,
    MAX_LOG_EVENTS,
};

pub struct SaveLog {
    /// None: ring buffer only, nothing written to disk.
    path: Option<PathBuf>,
    buf: VecDeque<SaveEvent>,
    next_id: u64,
    warn_pending: bool,
}

impl SaveLog {
    pub fn init(app_data_dir: &Path) -> Result<Self, String> {
        fs::create_dir_all(app_data_dir).map_err(|e| format!("save log dir create: {e}"))?;

        let mut log = Self {
            path: Some(app_data_dir.join(LOG_FILE_NAME)),
            buf: VecDeque::with_capacity(MAX_LOG_EVENTS),
            next_id: 1,
            warn_pending: false,
        };

        log.load_tail_best_effort();
        log.next_id = log.compute_next_id();

        Ok(log)
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            buf: VecDeque::with_capacity(MAX_LOG_EVENTS),
            next_id: 1,
            warn_pending: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record_best_effort(
        &mut self,
        class: SaveEventClass,
        kind: &str,
        context: &str,
        key: &str,
        msg: &str,
    ) {
        let ev = SaveEvent {
            id: self.alloc_id(),
            ts_ms: now_ms(),
            class,
            kind: kind.to_string(),
            context: context.to_string(),
            key: key.to_string(),
            msg: msg.to_string(),
        };

        if self.buf.len() >= MAX_LOG_EVENTS {
            self.buf.pop_front();
        }
        self.buf.push_back(ev.clone());

        if class == SaveEventClass::SaveFailure {
            self.warn_pending = true;
        }

        let Some(path) = self.path.as_deref() else {
            return;
        };
        let _ = rotate_if_needed_best_effort(path);
        let _ = append_jsonl_best_effort(path, &ev);
        let _ = trim_to_n_events(path, MAX_LOG_EVENTS);
    }

    pub fn recent(&self) -> Vec<SaveEvent> {
        self.buf.iter().cloned().collect()
    }

    pub fn take_warn_pending(&mut self) -> bool {
        let was = self.warn_pending;
        self.warn_pending = false;
        was
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn compute_next_id(&self) -> u64 {
        self.buf
            .iter()
            .map(|e| e.id)
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }

    fn load_tail_best_effort(&mut self) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let Ok(file) = File::open(path) else {
            return;
        };
        let reader = BufReader::new(file);

        let mut tail: VecDeque<String> = VecDeque::with_capacity(LOAD_TAIL_LINES);
        for line in reader.lines().map_while(Result::ok) {
            if tail.len() >= LOAD_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        for line in tail {
            if let Ok(ev) = serde_json::from_str::<SaveEvent>(&line) {
                if self.buf.len() >= MAX_LOG_EVENTS {
                    self.buf.pop_front();
                }
                self.buf.push_back(ev);
            }
        }
    }
}

fn rotate_if_needed_best_effort(path: &Path) -> Result<(), String> {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return Ok(()),
    };

    if meta.len() <= MAX_LOG_BYTES {
        return Ok(());
    }

    let backup = path.with_file_name(LOG_BACKUP_NAME);
    let _ = fs::remove_file(&backup);
    fs::rename(path, &backup).map_err(|e| format!("save log rotate: {e}"))?;

    sync_parent_dir(path);
    Ok(())
}

fn append_jsonl_best_effort(path: &Path, ev: &SaveEvent) -> Result<(), String> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("save log open: {e}"))?;

    let line = serde_json::to_string(ev).map_err(|e| format!("save log json: {e}"))?;
    f.write_all(line.as_bytes())
        .and_then(|_| f.write_all(b"\n"))
        .map_err(|e| format!("save log write: {e}"))?;

    let _ = f.flush();
    let _ = f.sync_all();
    Ok(())
}

fn trim_to_n_events(path: &Path, n: usize) -> Result<(), String> {
    if n == 0 {
        return Ok(());
    }

    let Ok(file) = File::open(path) else {
        return Ok(());
    };
    let reader = BufReader::new(file);

    let mut tail: VecDeque<String> = VecDeque::with_capacity(n.min(LOAD_TAIL_LINES));
    let mut exceeded = false;

    for line in reader.lines().map_while(Result::ok) {
        if tail.len() >= n {
            tail.pop_front();
            exceeded = true;
        }
        tail.push_back(line);
    }

    if !exceeded {
        return Ok(());
    }

    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut out = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .map_err(|e| format!("save log trim open tmp: {e}"))?;

        for line in tail {
            out.write_all(line.as_bytes())
                .and_then(|_| out.write_all(b"\n"))
                .map_err(|e| format!("save log trim write tmp: {e}"))?;
        }

        let _ = out.flush();
        let _ = out.sync_all();
    }

    fs::rename(&tmp, path).map_err(|e| format!("save log trim rename: {e}"))?;
    sync_parent_dir(path);

    Ok(())
}

fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = OpenOptions::new().read(true).open(parent) {
            let _ = dir.sync_all();
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ======================================================
// Unit Tests
// ======================================================
