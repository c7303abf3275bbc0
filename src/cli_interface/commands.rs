//! run a parsed [BobFsCli] against an image file
use std::{io::Write, path::Path};

use anyhow::{anyhow, bail, Context};
use byte_unit::Byte;

use super::BobFsCli;
use crate::{
    device::MmapImage,
    fs::{resolve, resolve_parent, BobFs, FileKind, Node, NodeStat, BLOCK_SIZE},
    mkfs::mkfs,
};

fn open(image_file_path: &str) -> anyhow::Result<BobFs<MmapImage>> {
    let image = MmapImage::open(image_file_path)
        .with_context(|| format!("failed to open image {image_file_path}"))?;
    BobFs::mount(image).with_context(|| format!("failed to mount {image_file_path}"))
}

fn existing<'fs>(fs: &'fs BobFs<MmapImage>, path: &str) -> anyhow::Result<Node<'fs, MmapImage>> {
    resolve(fs, path)?.ok_or_else(|| anyhow!("{path}: no such file or directory"))
}

fn kind_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Directory => "dir",
        FileKind::File => "file",
        FileKind::Unused => "unused",
        FileKind::Unknown(_) => "?",
    }
}

fn print_stat<W: Write>(out: &mut W, name: &str, stat: &NodeStat) -> anyhow::Result<()> {
    writeln!(
        out,
        "{:>5} {:<4} {:>3} {:>8} {name}",
        stat.inum,
        kind_label(stat.kind),
        stat.links,
        stat.size
    )?;
    Ok(())
}

/// execute `cli`, everything meant for the user goes to `out`
pub fn run<W: Write>(cli: BobFsCli, out: &mut W) -> anyhow::Result<()> {
    match cli {
        BobFsCli::Mkfs(args) => {
            let len = mkfs(&args.image_file_path)?;
            writeln!(
                out,
                "created {} ({})",
                args.image_file_path,
                Byte::from_bytes(len as _).get_appropriate_unit(true)
            )?;
        }
        BobFsCli::Df(args) => {
            let fs = open(&args.image_file_path)?;
            let usage = fs.usage()?;
            writeln!(
                out,
                "free blocks: {} ({}), free inodes: {}",
                usage.free_blocks,
                Byte::from_bytes((usage.free_blocks * BLOCK_SIZE) as _).get_appropriate_unit(true),
                usage.free_inodes
            )?;
        }
        BobFsCli::Ls(args) => {
            let fs = open(&args.image.image_file_path)?;
            let mut node = existing(&fs, &args.path)?;
            if node.is_dir()? {
                for (name, mut child) in node.list()? {
                    print_stat(out, &name, &child.stat()?)?;
                }
            } else {
                print_stat(out, &args.path, &node.stat()?)?;
            }
        }
        BobFsCli::Stat(args) => {
            let fs = open(&args.image.image_file_path)?;
            let stat = existing(&fs, &args.path)?.stat()?;
            writeln!(out, "path:  {}", args.path)?;
            writeln!(out, "inode: {}", stat.inum)?;
            writeln!(out, "kind:  {}", kind_label(stat.kind))?;
            writeln!(out, "links: {}", stat.links)?;
            writeln!(out, "size:  {}", stat.size)?;
        }
        BobFsCli::Mkdir(args) | BobFsCli::Touch(args) if args.path.trim_matches('/').is_empty() => {
            bail!("{}: the root directory already exists", args.path);
        }
        BobFsCli::Mkdir(args) => {
            let fs = open(&args.image.image_file_path)?;
            let (mut parent, name) = resolve_parent(&fs, &args.path)?;
            if parent.find(&name)?.is_some() {
                bail!("{}: already exists", args.path);
            }
            parent.create_directory(&name)?;
            fs.device().flush()?;
        }
        BobFsCli::Touch(args) => {
            let fs = open(&args.image.image_file_path)?;
            let (mut parent, name) = resolve_parent(&fs, &args.path)?;
            if parent.find(&name)?.is_none() {
                parent.create_file(&name)?;
                fs.device().flush()?;
            }
        }
        BobFsCli::Put(args) => {
            let content = std::fs::read(Path::new(&args.host_file))
                .with_context(|| format!("failed to read {}", args.host_file))?;
            let fs = open(&args.image.image_file_path)?;
            let (mut parent, name) = resolve_parent(&fs, &args.path)?;
            if parent.find(&name)?.is_some() {
                bail!("{}: already exists", args.path);
            }
            let mut file = parent.create_file(&name)?;
            let wrote = file.write_all(0, &content)?;
            file.commit()?;
            fs.device().flush()?;
            if wrote != content.len() {
                bail!(
                    "{}: only {wrote} of {} bytes fit into the file",
                    args.path,
                    content.len()
                );
            }
        }
        BobFsCli::Cat(args) => {
            let fs = open(&args.image.image_file_path)?;
            let mut file = existing(&fs, &args.path)?;
            if !file.is_file()? {
                bail!("{}: not a file", args.path);
            }
            let mut buf = [0u8; BLOCK_SIZE];
            let mut offset = 0;
            loop {
                let read = file.read_all(offset, &mut buf)?;
                if read == 0 {
                    break;
                }
                out.write_all(&buf[..read])?;
                offset += read as u32;
            }
        }
        BobFsCli::Ln(args) => {
            let fs = open(&args.image.image_file_path)?;
            let mut target = existing(&fs, &args.target)?;
            let (mut parent, name) = resolve_parent(&fs, &args.link_path)?;
            if parent.find(&name)?.is_some() {
                bail!("{}: already exists", args.link_path);
            }
            parent.link(&name, &mut target)?;
            fs.device().flush()?;
        }
        BobFsCli::Mv(args) => {
            let fs = open(&args.image.image_file_path)?;
            let (mut parent, name) = resolve_parent(&fs, &args.path)?;
            let mut node = parent
                .find(&name)?
                .ok_or_else(|| anyhow!("{}: no such file or directory", args.path))?;
            parent.rename(&mut node, &args.new_name)?;
            fs.device().flush()?;
        }
        BobFsCli::Rm(args) => {
            let fs = open(&args.image.image_file_path)?;
            let (mut parent, name) = resolve_parent(&fs, &args.path)?;
            let mut node = parent
                .find(&name)?
                .ok_or_else(|| anyhow!("{}: no such file or directory", args.path))?;
            parent.delete(&mut node)?;
            fs.device().flush()?;
        }
    }
    Ok(())
}
