mod coverage2;
