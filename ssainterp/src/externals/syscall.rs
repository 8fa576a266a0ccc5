//! syscall shims
//!
//! Calls go straight to the host through `libc`. Failures come back as
//! interpreted `error` values built from the host errno, never as runtime
//! errors. The `Stat_t` positions follow the linux/amd64 layout.

use super::Args;
use super::marshal::{copy_into_slice, errno_error, last_errno, wrap_io_result};
use crate::interp::{Frame, InterpResult, RuntimeError, Value};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use tracing::debug;

/// Fields written by the stat shims, through `Ctim`
const STAT_FIELDS: usize = 14;

/// Offset of `d_reclen` in a `dirent64` record
const DIRENT_RECLEN: usize = 16;
/// Offset of `d_name` in a `dirent64` record
const DIRENT_NAME: usize = 19;

fn errno_result(ret: libc::c_int) -> Value {
    if ret == -1 {
        errno_error(last_errno())
    } else {
        Value::Iface(None)
    }
}

/// `(n, nil)` or `(-1, err)` for calls returning a count
fn count_result(ret: isize) -> Value {
    if ret < 0 {
        Value::Tuple(vec![Value::Int(-1), errno_error(last_errno())])
    } else {
        Value::Tuple(vec![Value::Int(ret as i64), Value::Iface(None)])
    }
}

fn fd_arg(args: &Args<'_>, index: usize) -> InterpResult<Option<libc::c_int>> {
    Ok(libc::c_int::try_from(args.int(index)?).ok())
}

fn path_arg(args: &Args<'_>, index: usize) -> InterpResult<Option<CString>> {
    Ok(CString::new(args.string(index)?).ok())
}

// ============ Process ============

/// Unwinds to the driver with the exit signal
pub fn exit(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let code = args.int(0)?;
    Err(RuntimeError::exit(code as i32))
}

pub fn getpid(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Int(i64::from(std::process::id())))
}

/// func Getwd() (wd string, err error)
pub fn getwd(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    let wd = std::env::current_dir().map(|path| Value::str_from_bytes(path.as_os_str().as_bytes()));
    Ok(wrap_io_result(wd, Value::str("")))
}

/// func Kill(pid int, sig Signal) (err error)
pub fn kill(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let pid = args.int(0)?;
    let sig = args.int(1)?;
    let (Ok(pid), Ok(sig)) = (libc::pid_t::try_from(pid), libc::c_int::try_from(sig)) else {
        return Ok(errno_error(libc::EINVAL));
    };
    // SAFETY: kill takes no pointers.
    Ok(errno_result(unsafe { libc::kill(pid, sig) }))
}

/// Pointer arguments cannot be marshaled, so no raw call is attempted.
pub fn raw_syscall(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let trap = args.uintptr(0)?;
    for i in 1..4 {
        args.uintptr(i)?;
    }
    debug!(trap, "syscall.RawSyscall answered ENOSYS");
    Ok(Value::Tuple(vec![
        Value::Uintptr(0),
        Value::Uintptr(0),
        Value::Uintptr(libc::ENOSYS as u64),
    ]))
}

// ============ File descriptors ============

/// func Open(path string, mode int, perm uint32) (fd int, err error)
pub fn open(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let path = path_arg(args, 0)?;
    let mode = args.int(1)?;
    let perm = args.u32(2)?;
    let (Some(path), Ok(mode)) = (path, libc::c_int::try_from(mode)) else {
        return Ok(Value::Tuple(vec![Value::Int(-1), errno_error(libc::EINVAL)]));
    };
    // SAFETY: path is a NUL-terminated string that outlives the call.
    let fd = unsafe { libc::open(path.as_ptr(), mode, perm as libc::c_uint) };
    Ok(count_result(fd as isize))
}

/// func Close(fd int) (err error)
pub fn close(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let Some(fd) = fd_arg(args, 0)? else {
        return Ok(errno_error(libc::EBADF));
    };
    // SAFETY: close takes no pointers; a stale fd yields EBADF.
    Ok(errno_result(unsafe { libc::close(fd) }))
}

/// func Read(fd int, p []byte) (n int, err error)
///
/// Bytes read land in the caller's slice.
pub fn read(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let fd = fd_arg(args, 0)?;
    let target = args.slice(1)?;
    let Some(fd) = fd else {
        return Ok(Value::Tuple(vec![Value::Int(-1), errno_error(libc::EBADF)]));
    };
    let mut buf = vec![0u8; target.map_or(0, |elems| elems.borrow().len())];
    // SAFETY: buf is valid for writes of buf.len() bytes.
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n > 0
        && let Some(elems) = target
    {
        copy_into_slice(elems, &buf[..n as usize]);
    }
    Ok(count_result(n))
}

/// func Write(fd int, p []byte) (n int, err error)
pub fn write(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let fd = fd_arg(args, 0)?;
    let data = args.bytes(1)?;
    let Some(fd) = fd else {
        return Ok(Value::Tuple(vec![Value::Int(-1), errno_error(libc::EBADF)]));
    };
    // SAFETY: data is valid for reads of data.len() bytes.
    let n = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
    Ok(count_result(n))
}

/// func ReadDirent(fd int, buf []byte) (n int, err error)
///
/// Fills `buf` with raw `dirent64` records.
pub fn read_dirent(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let fd = fd_arg(args, 0)?;
    let target = args.slice(1)?;
    let Some(fd) = fd else {
        return Ok(Value::Tuple(vec![Value::Int(-1), errno_error(libc::EBADF)]));
    };
    let mut buf = vec![0u8; target.map_or(0, |elems| elems.borrow().len())];
    match getdents(fd, &mut buf) {
        Ok(n) => {
            if let Some(elems) = target {
                copy_into_slice(elems, &buf[..n]);
            }
            Ok(Value::Tuple(vec![Value::Int(n as i64), Value::Iface(None)]))
        }
        Err(errno) => Ok(Value::Tuple(vec![Value::Int(-1), errno_error(errno)])),
    }
}

#[cfg(target_os = "linux")]
fn getdents(fd: libc::c_int, buf: &mut [u8]) -> Result<usize, i32> {
    // SAFETY: the kernel writes at most buf.len() bytes into buf.
    let n = unsafe { libc::syscall(libc::SYS_getdents64, fd, buf.as_mut_ptr(), buf.len()) };
    if n < 0 { Err(last_errno()) } else { Ok(n as usize) }
}

#[cfg(not(target_os = "linux"))]
fn getdents(_fd: libc::c_int, _buf: &mut [u8]) -> Result<usize, i32> {
    Err(libc::ENOSYS)
}

/// func ParseDirent(buf []byte, max int, names []string) (consumed int, count int, newnames []string)
///
/// Appends up to `max` names (`max < 0` means no limit), skipping deleted
/// entries and the `.` and `..` links.
pub fn parse_dirent(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let buf = args.bytes(0)?;
    let mut max = args.int(1)?;
    let mut names = match args.slice(2)? {
        Some(elems) => elems.borrow().clone(),
        None => Vec::new(),
    };

    let mut rest = &buf[..];
    let mut count = 0i64;
    let mut consumed = None;
    while max != 0 && !rest.is_empty() {
        let reclen = match rest.get(DIRENT_RECLEN..DIRENT_RECLEN + 2) {
            Some(b) => usize::from(u16::from_ne_bytes([b[0], b[1]])),
            None => 0,
        };
        if reclen <= DIRENT_NAME || reclen > rest.len() {
            // Truncated record: report the whole buffer as consumed.
            consumed = Some(buf.len());
            break;
        }
        let (record, tail) = rest.split_at(reclen);
        rest = tail;

        let ino = u64::from_ne_bytes(record[..8].try_into().unwrap_or_default());
        if ino == 0 {
            continue;
        }
        let name = &record[DIRENT_NAME..];
        let name = &name[..name.iter().position(|&b| b == 0).unwrap_or(name.len())];
        if name == b"." || name == b".." {
            continue;
        }
        max -= 1;
        count += 1;
        names.push(Value::str_from_bytes(name));
    }
    let consumed = consumed.unwrap_or(buf.len() - rest.len());

    Ok(Value::Tuple(vec![
        Value::Int(consumed as i64),
        Value::Int(count),
        Value::slice(names),
    ]))
}

// ============ Stat ============

/// func Stat(path string, stat *Stat_t) (err error)
pub fn stat(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    // SAFETY: path is NUL-terminated and st is a valid out-pointer.
    stat_path(args, |path, st| unsafe { libc::stat(path.as_ptr(), st) })
}

/// func Lstat(path string, stat *Stat_t) (err error)
pub fn lstat(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    // SAFETY: path is NUL-terminated and st is a valid out-pointer.
    stat_path(args, |path, st| unsafe { libc::lstat(path.as_ptr(), st) })
}

/// func Fstat(fd int, stat *Stat_t) (err error)
pub fn fstat(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let fd = fd_arg(args, 0)?;
    check_stat_target(args)?;
    let Some(fd) = fd else {
        return Ok(errno_error(libc::EBADF));
    };
    // SAFETY: stat is plain old data; all-zero is a valid value.
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    // SAFETY: st is a valid out-pointer.
    if unsafe { libc::fstat(fd, &mut st) } == -1 {
        return Ok(errno_error(last_errno()));
    }
    fill_stat(args, &st)?;
    Ok(Value::Iface(None))
}

fn stat_path(
    args: &Args<'_>,
    call: impl FnOnce(&CString, &mut libc::stat) -> libc::c_int,
) -> InterpResult<Value> {
    let path = path_arg(args, 0)?;
    check_stat_target(args)?;
    let Some(path) = path else {
        return Ok(errno_error(libc::EINVAL));
    };
    // SAFETY: stat is plain old data; all-zero is a valid value.
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    if call(&path, &mut st) == -1 {
        return Ok(errno_error(last_errno()));
    }
    fill_stat(args, &st)?;
    Ok(Value::Iface(None))
}

fn check_stat_target(args: &Args<'_>) -> InterpResult<()> {
    let cell = args.pointer(1)?;
    let target = cell.borrow();
    match &*target {
        Value::Struct(fields) if fields.len() >= STAT_FIELDS => Ok(()),
        other => Err(args.shape_error(1, "*syscall.Stat_t", other)),
    }
}

fn timespec(sec: i64, nsec: i64) -> Value {
    Value::Struct(vec![Value::Int64(sec), Value::Int64(nsec)])
}

#[allow(clippy::unnecessary_cast)]
fn fill_stat(args: &Args<'_>, st: &libc::stat) -> InterpResult<()> {
    let cell = args.pointer(1)?;
    let mut target = cell.borrow_mut();
    let Value::Struct(fields) = &mut *target else {
        return Ok(());
    };
    fields[0] = Value::Uint64(st.st_dev as u64);
    fields[1] = Value::Uint64(st.st_ino as u64);
    fields[2] = Value::Uint64(st.st_nlink as u64);
    fields[3] = Value::Uint32(st.st_mode as u32);
    fields[4] = Value::Uint32(st.st_uid as u32);
    fields[5] = Value::Uint32(st.st_gid as u32);
    fields[7] = Value::Uint64(st.st_rdev as u64);
    fields[8] = Value::Int64(st.st_size as i64);
    fields[9] = Value::Int64(st.st_blksize as i64);
    fields[10] = Value::Int64(st.st_blocks as i64);
    fields[11] = timespec(st.st_atime as i64, st.st_atime_nsec as i64);
    fields[12] = timespec(st.st_mtime as i64, st.st_mtime_nsec as i64);
    fields[13] = timespec(st.st_ctime as i64, st.st_ctime_nsec as i64);
    Ok(())
}
