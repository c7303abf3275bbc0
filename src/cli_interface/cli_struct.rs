use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum BobFsCli {
    /// create a new file system image
    Mkfs(ImageArgs),
    /// list a directory
    Ls(PathArgs),
    /// create a directory
    Mkdir(PathArgs),
    /// create an empty file
    Touch(PathArgs),
    /// copy a host file into the file system
    Put(PutArgs),
    /// print the content of a file
    Cat(PathArgs),
    /// add another name for an existing node
    Ln(LnArgs),
    /// rename an entry inside its directory
    Mv(MvArgs),
    /// remove a name, the node goes with its last name
    Rm(PathArgs),
    /// show the inode of a path
    Stat(PathArgs),
    /// show free blocks and inodes
    Df(ImageArgs),
}

/// the image every subcommand works on
#[derive(clap::Args, Debug, PartialEq)]
pub struct ImageArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct PathArgs {
    #[command(flatten)]
    pub image: ImageArgs,
    /// absolute path inside the file system
    #[clap(default_value = "/")]
    pub path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct PutArgs {
    #[command(flatten)]
    pub image: ImageArgs,
    /// the host file to copy
    pub host_file: String,
    /// where the copy goes inside the file system
    pub path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct LnArgs {
    #[command(flatten)]
    pub image: ImageArgs,
    /// an existing path
    pub target: String,
    /// the new name
    pub link_path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct MvArgs {
    #[command(flatten)]
    pub image: ImageArgs,
    pub path: String,
    /// new name inside the same directory
    pub new_name: String,
}


/// test subcommands taking paths
#[cfg(test)]
mod path_parse_args_tests {
    use super::*;

    fn image() -> ImageArgs {
        ImageArgs {
            image_file_path: "test".to_string(),
        }
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let args = BobFsCli::parse_from(["bobfs", "ls", "-p", "test"]);
        assert_eq!(
            args,
            BobFsCli::Ls(PathArgs {
                image: image(),
                path: "/".to_string(),
            })
        );
    }

    #[test]
    fn test_put() {
        let args = BobFsCli::parse_from(["bobfs", "put", "-p", "test", "host.txt", "/docs/a"]);
        assert_eq!(
            args,
            BobFsCli::Put(PutArgs {
                image: image(),
                host_file: "host.txt".to_string(),
                path: "/docs/a".to_string(),
            })
        );
    }

    #[test]
    fn test_ln_and_mv() {
        let image_file_path_name = concat!("--", "image-file-path");
        let args = BobFsCli::parse_from(["bobfs", "ln", image_file_path_name, "test", "/a", "/b"]);
        assert_eq!(
            args,
            BobFsCli::Ln(LnArgs {
                image: image(),
                target: "/a".to_string(),
                link_path: "/b".to_string(),
            })
        );

        let args = BobFsCli::parse_from(["bobfs", "mv", "-p", "test", "/a", "c"]);
        assert_eq!(
            args,
            BobFsCli::Mv(MvArgs {
                image: image(),
                path: "/a".to_string(),
                new_name: "c".to_string(),
            })
        );
    }
}
