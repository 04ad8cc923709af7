use super::{node, path, MemoryFileSystem, Node, OpenFile, StdioKind};
use crate::{
    memory::{self, RawIoVec},
    types::{oflags, whence, Errno, FileType},
};

impl MemoryFileSystem {
    fn dir_path(&self, fd: u32) -> Result<&str, Errno> {
        match self.open.get(&fd) {
            Some(OpenFile::Node { path, .. }) => Ok(path.as_str()),
            Some(OpenFile::Stdio(_)) => Err(Errno::Notdir),
            None => Err(Errno::Badf),
        }
    }

    fn node_path(&self, fd: u32) -> Result<(&str, u64), Errno> {
        match self.open.get(&fd) {
            Some(OpenFile::Node { path, position, .. }) => Ok((path.as_str(), *position)),
            Some(OpenFile::Stdio(_)) => Err(Errno::Inval),
            None => Err(Errno::Badf),
        }
    }

    /// `fd_fdstat_get`: writes the descriptor's file type into `stat_ptr`.
    pub(crate) fn fd_fdstat_get(&self, memory: &mut [u8], fd: u32, stat_ptr: u32) -> Result<(), Errno> {
        let filetype = match self.open.get(&fd).ok_or(Errno::Badf)? {
            OpenFile::Stdio(_) => FileType::CharacterDevice,
            OpenFile::Node { path, .. } => {
                node::lookup(&self.root, path).ok_or(Errno::Noent)?.filetype()
            }
        };
        memory::write_fdstat(memory, stat_ptr, filetype, 0)
    }

    /// `fd_filestat_get`: writes type and, for regular files, size.
    pub(crate) fn fd_filestat_get(&self, memory: &mut [u8], fd: u32, stat_ptr: u32) -> Result<(), Errno> {
        let entry = self.open.get(&fd).ok_or(Errno::Badf)?;
        let node = match entry {
            OpenFile::Stdio(_) => {
                memory::write_filestat(memory, stat_ptr, FileType::CharacterDevice)?;
                return Ok(());
            }
            OpenFile::Node { path, .. } => node::lookup(&self.root, path).ok_or(Errno::Noent)?,
        };
        memory::write_filestat(memory, stat_ptr, node.filetype())?;
        if let Some(content) = node.as_file() {
            memory::write_filestat_size(memory, stat_ptr, content.len() as u64)?;
        }
        Ok(())
    }

    /// `fd_prestat_get`: only valid for preopen descriptors.
    pub(crate) fn fd_prestat_get(&self, memory: &mut [u8], fd: u32, prestat_ptr: u32) -> Result<(), Errno> {
        match self.open.get(&fd) {
            Some(OpenFile::Node { path, is_preopen: true, .. }) => {
                memory::write_prestat_dir(memory, prestat_ptr, path.len() as u32)
            }
            _ => Err(Errno::Badf),
        }
    }

    /// `fd_prestat_dir_name`: writes the preopen's path bytes into `buf`.
    pub(crate) fn fd_prestat_dir_name(
        &self,
        memory: &mut [u8],
        fd: u32,
        buf: u32,
        buf_len: u32,
    ) -> Result<(), Errno> {
        match self.open.get(&fd) {
            Some(OpenFile::Node { path, is_preopen: true, .. }) => {
                if path.len() as u32 != buf_len {
                    return Err(Errno::Inval);
                }
                memory::write_string(memory, buf, path)?;
                Ok(())
            }
            _ => Err(Errno::Badf),
        }
    }

    /// `fd_close`: stdio's close hook runs but the slot stays bound (see
    /// [`crate::providers::stdio::Writable::close`]); anything else is
    /// removed from the open-file table.
    pub(crate) fn fd_close(&mut self, fd: u32) -> Result<(), Errno> {
        match self.open.get(&fd) {
            Some(OpenFile::Stdio(StdioKind::In)) => {
                self.stdio.stdin.close();
                Ok(())
            }
            Some(OpenFile::Stdio(StdioKind::Out)) => {
                self.stdio.stdout.close();
                Ok(())
            }
            Some(OpenFile::Stdio(StdioKind::Err)) => {
                self.stdio.stderr.close();
                Ok(())
            }
            Some(OpenFile::Node { path, .. }) => {
                self.path_to_fd.remove(path);
                self.open.remove(&fd);
                Ok(())
            }
            None => Err(Errno::Badf),
        }
    }

    /// `fd_seek`: clamps negative results to 0 and writes the new offset as
    /// a 64-bit value.
    pub(crate) fn fd_seek(
        &mut self,
        memory: &mut [u8],
        fd: u32,
        offset: i64,
        whence: u8,
        new_offset_ptr: u32,
    ) -> Result<(), Errno> {
        if fd < 3 {
            return Err(Errno::Inval);
        }
        let (path, position) = self.node_path(fd)?;
        let path = path.to_string();
        let len = node::lookup(&self.root, &path)
            .and_then(Node::as_file)
            .map(|content| content.len() as i64)
            .ok_or(Errno::Isdir)?;
        let base = match whence {
            whence::SET => 0,
            whence::CUR => position as i64,
            whence::END => len,
            _ => return Err(Errno::Inval),
        };
        let new_position = (base + offset).max(0) as u64;
        if let Some(OpenFile::Node { position, .. }) = self.open.get_mut(&fd) {
            *position = new_position;
        }
        memory::write_u64(memory, new_offset_ptr, new_position)
    }

    /// `fd_tell`: writes the current offset.
    pub(crate) fn fd_tell(&self, memory: &mut [u8], fd: u32, out_ptr: u32) -> Result<(), Errno> {
        let (_, position) = self.node_path(fd)?;
        memory::write_u64(memory, out_ptr, position)
    }

    /// `fd_read`: dispatches on node kind, copying into the guest's iovecs.
    pub(crate) fn fd_read(
        &mut self,
        memory: &mut [u8],
        fd: u32,
        iovecs: &[RawIoVec],
        nread_ptr: u32,
    ) -> Result<(), Errno> {
        let n = match self.open.get(&fd).ok_or(Errno::Badf)? {
            OpenFile::Stdio(StdioKind::In) => {
                let mut views = memory::iov_views_mut(memory, iovecs)?;
                let mut total = 0usize;
                for view in views.iter_mut() {
                    let n = self
                        .stdio
                        .stdin
                        .read(view)
                        .map_err(|_| Errno::Inval)?;
                    total += n;
                    if n < view.len() {
                        break;
                    }
                }
                total
            }
            OpenFile::Stdio(_) => return Err(Errno::Inval),
            OpenFile::Node { path, position, .. } => {
                let path = path.clone();
                let position = *position;
                let node = node::lookup(&self.root, &path).ok_or(Errno::Noent)?;
                match node {
                    Node::Directory(_) => return Err(Errno::Isdir),
                    Node::DevNull => 0,
                    Node::File(content) => {
                        let start = (position as usize).min(content.len());
                        let available = &content[start..];
                        let mut views = memory::iov_views_mut(memory, iovecs)?;
                        let mut total = 0usize;
                        for view in views.iter_mut() {
                            let remaining = &available[total.min(available.len())..];
                            let n = remaining.len().min(view.len());
                            view[..n].copy_from_slice(&remaining[..n]);
                            total += n;
                            if n < view.len() {
                                break;
                            }
                        }
                        if let Some(OpenFile::Node { position, .. }) = self.open.get_mut(&fd) {
                            *position += total as u64;
                        }
                        total
                    }
                }
            }
        };
        memory::write_u32(memory, nread_ptr, n as u32)
    }

    /// `fd_write`: dispatches on node kind, concatenating the guest's iovecs.
    pub(crate) fn fd_write(
        &mut self,
        memory: &mut [u8],
        fd: u32,
        iovecs: &[RawIoVec],
        nwritten_ptr: u32,
    ) -> Result<(), Errno> {
        let views = memory::iov_views(memory, iovecs)?;
        let total_len: usize = views.iter().map(|v| v.len()).sum();
        let n = match self.open.get(&fd).ok_or(Errno::Badf)? {
            OpenFile::Stdio(StdioKind::Out) => {
                let buf: Vec<u8> = views.iter().flat_map(|v| v.iter().copied()).collect();
                self.stdio.stdout.write(&buf).map_err(|_| Errno::Inval)?;
                total_len
            }
            OpenFile::Stdio(StdioKind::Err) => {
                let buf: Vec<u8> = views.iter().flat_map(|v| v.iter().copied()).collect();
                self.stdio.stderr.write(&buf).map_err(|_| Errno::Inval)?;
                total_len
            }
            OpenFile::Stdio(StdioKind::In) => return Err(Errno::Inval),
            OpenFile::Node { path, position, .. } => {
                let path = path.clone();
                let position = *position;
                let node = node::lookup_mut(&mut self.root, &path).ok_or(Errno::Noent)?;
                match node {
                    Node::Directory(_) => return Err(Errno::Isdir),
                    Node::DevNull => total_len,
                    Node::File(content) => {
                        let end = position as usize + total_len;
                        if content.len() < end {
                            content.resize(end, 0);
                        }
                        let mut offset = position as usize;
                        for view in &views {
                            content[offset..offset + view.len()].copy_from_slice(view);
                            offset += view.len();
                        }
                        if let Some(OpenFile::Node { position, .. }) = self.open.get_mut(&fd) {
                            *position += total_len as u64;
                        }
                        total_len
                    }
                }
            }
        };
        memory::write_u32(memory, nwritten_ptr, n as u32)
    }

    /// `fd_readdir`: writes `dirent` records for each child of the
    /// directory, starting after the index encoded by `cookie`.
    pub(crate) fn fd_readdir(
        &self,
        memory: &mut [u8],
        fd: u32,
        buf: u32,
        buf_len: u32,
        cookie: u64,
        bufused_ptr: u32,
    ) -> Result<(), Errno> {
        let path = self.dir_path(fd)?;
        let children = node::lookup(&self.root, path)
            .and_then(Node::as_dir)
            .ok_or(Errno::Notdir)?;
        let mut written = 0u32;
        let mut next_cookie = cookie;
        for (index, (name, child)) in children.iter().enumerate().skip(cookie as usize) {
            next_cookie = index as u64 + 1;
            let name_len = name.len() as u32;
            let entry_len = 24 + name_len;
            if written + entry_len > buf_len {
                break;
            }
            let entry_ptr = buf + written;
            memory::write_u64(memory, entry_ptr, next_cookie)?;
            memory::write_u64(memory, entry_ptr + 8, 0)?; // d_ino, unused
            memory::write_u32(memory, entry_ptr + 16, name_len)?;
            let mem_slice = memory
                .get_mut(entry_ptr as usize + 20..entry_ptr as usize + 24)
                .ok_or(Errno::Inval)?;
            mem_slice.fill(0);
            mem_slice[0] = child.filetype() as u8;
            memory::write_bytes(memory, entry_ptr + 24, name.as_bytes())?;
            written += entry_len;
        }
        memory::write_u32(memory, bufused_ptr, written)
    }

    /// `path_create_directory`: ensures every directory segment exists.
    pub(crate) fn path_create_directory(&mut self, dir_fd: u32, rel_path: &str) -> Result<(), Errno> {
        let base = self.dir_path(dir_fd)?.to_string();
        let target = path::join(&base, rel_path);
        node::ensure_dir_path(&mut self.root, &target).map_err(|_| Errno::Notdir)
    }

    /// `path_filestat_get`: resolves `rel_path` against `dir_fd` and writes
    /// the resolved node's filestat.
    pub(crate) fn path_filestat_get(
        &self,
        memory: &mut [u8],
        dir_fd: u32,
        rel_path: &str,
        stat_ptr: u32,
    ) -> Result<(), Errno> {
        let base = self.dir_path(dir_fd)?;
        let target = path::join(base, rel_path);
        let node = node::lookup(&self.root, &target).ok_or(Errno::Noent)?;
        memory::write_filestat(memory, stat_ptr, node.filetype())?;
        if let Some(content) = node.as_file() {
            memory::write_filestat_size(memory, stat_ptr, content.len() as u64)?;
        }
        Ok(())
    }

    /// `path_unlink_file` / `path_remove_directory`: removes the named
    /// entry from its parent directory. No recursion requirement.
    pub(crate) fn path_remove(&mut self, dir_fd: u32, rel_path: &str) -> Result<(), Errno> {
        let base = self.dir_path(dir_fd)?.to_string();
        let target = path::join(&base, rel_path);
        self.path_to_fd.remove(&target);
        node::remove(&mut self.root, &target)
            .map(|_| ())
            .ok_or(Errno::Noent)
    }

    /// `path_open`: resolves `rel_path` relative to `dir_fd`, applying
    /// `oflags`, and returns the (possibly reused) descriptor via
    /// `opened_fd`.
    ///
    /// Repeated opens of the same absolute path return the same descriptor
    /// instead of allocating a new one. This departs from POSIX, where each
    /// `open` yields an independent descriptor with its own offset, but is
    /// kept here for simplicity.
    pub(crate) fn path_open(
        &mut self,
        dir_fd: u32,
        rel_path: &str,
        oflags: u16,
    ) -> Result<u32, Errno> {
        let base = self.dir_path(dir_fd)?.to_string();
        let target = path::join(&base, rel_path);

        if let Some(&fd) = self.path_to_fd.get(&target) {
            return Ok(fd);
        }

        let exists = node::lookup(&self.root, &target).is_some();
        if exists && oflags & oflags::EXCL != 0 {
            return Err(Errno::Exist);
        }
        if !exists && oflags & oflags::CREAT == 0 {
            return Err(Errno::Noent);
        }
        if !exists {
            node::insert(&mut self.root, &target, Node::File(Vec::new()))
                .map_err(|_| Errno::Notdir)?;
        } else if oflags & oflags::TRUNC != 0 {
            if let Some(content) = node::lookup_mut(&mut self.root, &target).and_then(Node::as_file_mut) {
                content.clear();
            }
        }

        let fd = self.alloc_fd();
        self.open.insert(
            fd,
            OpenFile::Node {
                path: target.clone(),
                position: 0,
                is_preopen: false,
            },
        );
        self.path_to_fd.insert(target, fd);
        Ok(fd)
    }
}
