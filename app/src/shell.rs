use crate::{print_categories, print_photo, Context};
use gallery::{Filter, GalleryController, GalleryEvent, SortDirection, SortMethod, SortState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
commands:
  list                      show visible photos
  filter <all|favorites|name>
  sort <date|size> <asc|desc>
  fav <photo>               toggle favorite
  cat <photo> [names...]    replace categories
  show <photo>
  categories
  new <name>                create category
  rename <id> <name>
  delete <id>
  signin <email> <password>
  signout
  quit";

fn describe(event: &GalleryEvent) -> Option<String> {
    match event {
        GalleryEvent::FavoriteReverted { photo_id, .. } => {
            Some(format!("! favorite change for {} was not saved remotely", photo_id))
        }
        GalleryEvent::CategoryCreated(c) => Some(format!("+ category {} ({})", c.name, c.id)),
        GalleryEvent::VisibleChanged(n) => Some(format!("{} photos visible", n)),
        _ => None,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<GalleryEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let Some(line) = describe(&event) {
            println!("{}", line);
        }
    }
}

pub async fn run(
    ctx: &mut Context,
    controller: GalleryController,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut gallery = controller.with_events(tx);

    println!("Galleryze: {} photos. Type 'help' for commands.", gallery.photos().len());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            continue;
        };
        match (cmd, args) {
            ("quit" | "exit", _) => break,
            ("help", _) => println!("{}", HELP),
            ("list", _) => gallery.visible_photos().into_iter().for_each(print_photo),
            ("filter", rest) => {
                let filter: Filter = rest.join(" ").parse()?;
                gallery.set_filter(filter);
            }
            ("sort", [method, direction]) => match (method.parse::<SortMethod>(), direction.parse::<SortDirection>()) {
                (Ok(m), Ok(d)) => {
                    gallery.set_sort(SortState::new(m, d));
                }
                (Err(e), _) | (_, Err(e)) => println!("{}", e),
            },
            ("fav", [id]) => {
                if let Some(state) = gallery.toggle_favorite(id).await {
                    println!("{}: {:?}", id, state);
                } else {
                    println!("Photo not found: {}", id);
                }
            }
            ("cat", [id, names @ ..]) => {
                if let Err(e) = gallery.set_categories(id, names.iter()).await {
                    println!("{}", e);
                }
            }
            ("show", [id]) => match gallery.photo_details(id) {
                Ok(details) => println!("{}", details),
                Err(e) => println!("{}", e),
            },
            ("categories", _) => print_categories(&gallery),
            ("new", rest) if !rest.is_empty() => {
                if let Err(e) = gallery.create_category(&rest.join(" ")).await {
                    println!("{}", e);
                }
            }
            ("rename", [id, name @ ..]) if !name.is_empty() => {
                if let Err(e) = gallery.rename_category(id, &name.join(" ")).await {
                    println!("{}", e);
                }
            }
            ("delete", [id]) => {
                if let Err(e) = gallery.delete_category(id).await {
                    println!("{}", e);
                }
            }
            ("signin", [email, password]) => match ctx.sessions.sign_in(email, password).await {
                Ok(session) => {
                    let source = gallery.sign_in_session(session).await;
                    println!("Signed in; state loaded from {:?}", source);
                }
                Err(e) => println!("Sign-in failed: {}", e),
            },
            ("signout", _) => {
                if let Err(e) = ctx.sessions.sign_out().await {
                    println!("{}", e);
                }
                gallery.sign_out_session().await;
                println!("Signed out");
            }
            _ => println!("Unknown command. Type 'help'."),
        }
        drain(&mut rx);
    }
    Ok(())
}
