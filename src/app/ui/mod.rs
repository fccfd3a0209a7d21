mod fps;
