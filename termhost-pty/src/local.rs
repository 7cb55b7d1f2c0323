use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use portable_pty::{Child, CommandBuilder, MasterPty, NativePtySystem, PtySystem};

use crate::errors::PtyError;
use crate::size::PtySize;
use crate::{PtyHandle, PtyReader};

/// Read half of a locally spawned PTY: just the cloned reader `portable-pty`
/// hands back from the master.
pub struct LocalPtyReader {
    reader: Box<dyn Read + Send>,
}

impl PtyReader for LocalPtyReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PtyError> {
        Ok(self.reader.read(buf)?)
    }
}

/// Write/resize/lifecycle half of a locally spawned PTY.
pub struct LocalPtyHandle {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
}

impl PtyHandle for LocalPtyHandle {
    fn write(&mut self, input: &[u8]) -> Result<usize, PtyError> {
        Ok(self.writer.write(input)?)
    }

    fn resize(&mut self, size: PtySize) -> Result<(), PtyError> {
        self.master.resize(size.into()).map_err(PtyError::Resize)
    }

    fn kill(&mut self, _force: bool) -> Result<(), PtyError> {
        let mut killer = self.child.clone_killer();
        killer.kill().map_err(PtyError::Io)
    }

    fn try_wait(&mut self) -> Result<Option<i32>, PtyError> {
        Ok(self
            .child
            .try_wait()
            .map_err(PtyError::Io)?
            .map(|status| status.exit_code() as i32))
    }

    fn wait(&mut self) -> Result<i32, PtyError> {
        Ok(self.child.wait().map_err(PtyError::Io)?.exit_code() as i32)
    }
}

/// Builder for spawning a [`LocalPty`] running `program`.
pub struct LocalPtyBuilder {
    cmd: CommandBuilder,
    size: PtySize,
    cwd: Option<PathBuf>,
}

/// Start building a local PTY that runs `program`.
pub fn local(program: &str) -> LocalPtyBuilder {
    LocalPtyBuilder {
        cmd: CommandBuilder::new(program),
        size: PtySize::default(),
        cwd: None,
    }
}

impl LocalPtyBuilder {
    pub fn with_arg(mut self, arg: &str) -> Self {
        self.cmd.arg(arg);
        self
    }

    pub fn with_args(mut self, args: &[String]) -> Self {
        for arg in args {
            self.cmd.arg(arg.as_str());
        }
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn with_env_remove(mut self, key: &str) -> Self {
        self.cmd.env_remove(key);
        self
    }

    pub fn with_size(mut self, size: PtySize) -> Self {
        self.size = size;
        self
    }

    pub fn with_cwd<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Spawns the child process, returning its PTY split into an
    /// exclusively-owned read half and a shareable write/control half.
    pub fn spawn(mut self) -> Result<(LocalPtyReader, LocalPtyHandle), PtyError> {
        if let Some(cwd) = self.cwd.take() {
            self.cmd.cwd(cwd);
        }

        let system = NativePtySystem::default();
        let pair = system.openpty(self.size.into()).map_err(PtyError::Spawn)?;
        let child = pair
            .slave
            .spawn_command(self.cmd)
            .map_err(PtyError::Spawn)?;

        // The child owns the slave end of the pty as its controlling
        // terminal; drop our handle so it isn't held open twice.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(PtyError::Spawn)?;
        let writer = pair.master.take_writer().map_err(PtyError::Spawn)?;

        Ok((
            LocalPtyReader { reader },
            LocalPtyHandle { master: pair.master, child, writer },
        ))
    }
}
